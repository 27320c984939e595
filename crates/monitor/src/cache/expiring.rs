//! Concurrent get-or-create cache with idle expiry and a size cap
//!
//! Entries live in a sharded [`DashMap`]. Each entry carries its last access
//! time as an atomic nanosecond offset from the cache's creation instant, so a
//! hit only needs a shard read lock.
//!
//! Eviction is amortized: every operation checks an elapsed-time gate and the
//! caller that wins the compare-and-swap on the gate runs the sweep. A sweep
//! locks one shard at a time and never removes an entry whose last access is
//! later than the instant the sweep started.

use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::config::ExpiringCacheConfig;
use super::stats::{CacheStats, MetricsCollector};
use crate::clock::{Clock, SystemClock};
use crate::error::MonitorResult;

/// Entry stored in the cache with its last access offset
#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    last_access: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: u64) -> Self {
        Self { value, last_access: AtomicU64::new(now) }
    }

    fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Acquire)
    }

    fn touch(&self, now: u64) {
        self.last_access.fetch_max(now, Ordering::AcqRel);
    }

    /// Idle strictly longer than `idle` as of `now`. An entry touched after
    /// `now` is never idle.
    fn is_idle(&self, now: u64, idle: u64) -> bool {
        now.saturating_sub(self.last_access()) > idle
    }
}

/// Outcome of installing a value for a key
///
/// At most one value is live per key: when two callers race, one gets
/// `Inserted` with its own value and the other gets `AlreadyPresent` with the
/// winner's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installed<V> {
    /// The supplied value is now the live value
    Inserted(V),
    /// Another value was already live; the supplied value was dropped
    AlreadyPresent(V),
}

impl<V> Installed<V> {
    /// The live value, whichever way the race went
    pub fn into_inner(self) -> V {
        match self {
            Self::Inserted(value) | Self::AlreadyPresent(value) => value,
        }
    }

    /// Whether the supplied value won
    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Entries removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Removed for being idle past the expiry
    pub expired: usize,
    /// Removed to bring the cache back under its size cap
    pub evicted: usize,
}

impl SweepReport {
    /// Total entries removed
    pub fn removed(&self) -> usize {
        self.expired + self.evicted
    }
}

/// Thread-safe expiring cache with lazy, factory-built values
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`; store shared values as `Arc<T>`)
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use dynmon::cache::{ExpiringCache, ExpiringCacheConfig};
///
/// let cache: ExpiringCache<String, u64> =
///     ExpiringCache::new(ExpiringCacheConfig::new(Duration::from_secs(60), 100))?;
///
/// assert_eq!(cache.get_or_create("a".to_string(), |_| 1), 1);
/// // The factory is not consulted for a live key.
/// assert_eq!(cache.get_or_create("a".to_string(), |_| 2), 1);
/// # Ok::<(), dynmon::MonitorError>(())
/// ```
pub struct ExpiringCache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    entries: DashMap<K, CacheEntry<V>>,
    config: ExpiringCacheConfig,
    clock: C,
    epoch: Instant,
    idle_nanos: u64,
    interval_nanos: u64,
    next_sweep: AtomicU64,
    metrics: MetricsCollector,
}

impl<K, V> ExpiringCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache using the system clock
    pub fn new(config: ExpiringCacheConfig) -> MonitorResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> ExpiringCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a new cache with a custom clock (useful for testing)
    pub fn with_clock(config: ExpiringCacheConfig, clock: C) -> MonitorResult<Self> {
        config.validate()?;
        let interval_nanos = nanos(config.sweep_interval);
        Ok(Self {
            entries: DashMap::new(),
            idle_nanos: nanos(config.idle_expiry),
            interval_nanos,
            next_sweep: AtomicU64::new(interval_nanos),
            epoch: clock.now(),
            metrics: MetricsCollector::default(),
            config,
            clock,
        })
    }

    /// Return the live value for `key`, building and installing one with
    /// `factory` if there is none.
    ///
    /// Under contention the factory may run in several callers; only one
    /// result is installed and every caller receives that one.
    pub fn get_or_create<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        match self.get_or_try_create(key, |k| Ok::<V, Infallible>(factory(k))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_create`](Self::get_or_create)
    ///
    /// A factory error is returned as-is and nothing is installed.
    pub fn get_or_try_create<F, E>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        self.maybe_sweep();

        if let Some(value) = self.lookup(&key, self.now_nanos()) {
            return Ok(value);
        }

        let value = factory(&key)?;
        Ok(self.install(key, value).into_inner())
    }

    /// Install `value` unless a live value already exists for `key`
    pub fn try_install(&self, key: K, value: V) -> Installed<V> {
        self.maybe_sweep();
        self.install(key, value)
    }

    /// Look up a live value without creating one
    ///
    /// A hit refreshes the entry's last access time.
    pub fn get(&self, key: &K) -> Option<V> {
        self.maybe_sweep();
        self.lookup(key, self.now_nanos())
    }

    /// Look up a live value without refreshing its access time
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = self.now_nanos();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_idle(now, self.idle_nanos))
            .map(|entry| entry.value.clone())
    }

    /// Whether a live (non-idle) entry exists for `key`; does not refresh it
    pub fn contains_key(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Remove an entry, returning its value
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently stored, including idle ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the live keys
    pub fn keys(&self) -> Vec<K> {
        let now = self.now_nanos();
        self.entries
            .iter()
            .filter(|entry| !entry.is_idle(now, self.idle_nanos))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Snapshot of the live values; reading does not refresh them
    pub fn values(&self) -> Vec<V> {
        let now = self.now_nanos();
        self.entries
            .iter()
            .filter(|entry| !entry.is_idle(now, self.idle_nanos))
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Snapshot of the live key/value pairs
    pub fn entries(&self) -> Vec<(K, V)> {
        let now = self.now_nanos();
        self.entries
            .iter()
            .filter(|entry| !entry.is_idle(now, self.idle_nanos))
            .map(|entry| (entry.key().clone(), entry.value.clone()))
            .collect()
    }

    /// Run an eviction sweep now, regardless of the sweep interval
    pub fn sweep(&self) -> SweepReport {
        let now = self.now_nanos();
        self.next_sweep.store(now.saturating_add(self.interval_nanos), Ordering::Release);
        self.sweep_at(now)
    }

    /// Cache configuration
    pub fn config(&self) -> &ExpiringCacheConfig {
        &self.config
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len(), self.config.max_entries)
    }

    fn now_nanos(&self) -> u64 {
        nanos(self.clock.now().saturating_duration_since(self.epoch))
    }

    fn lookup(&self, key: &K, now: u64) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_idle(now, self.idle_nanos) {
                entry.touch(now);
                self.metrics.record_hit();
                return Some(entry.value.clone());
            }
            // Shard read lock must be released before removing.
            drop(entry);
            if self.entries.remove_if(key, |_, entry| entry.is_idle(now, self.idle_nanos)).is_some()
            {
                self.metrics.record_expirations(1);
            }
        }
        self.metrics.record_miss();
        None
    }

    fn install(&self, key: K, value: V) -> Installed<V> {
        let now = self.now_nanos();
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_idle(now, self.idle_nanos) {
                    occupied.insert(CacheEntry::new(value.clone(), now));
                    self.metrics.record_expirations(1);
                    self.metrics.record_insert();
                    Installed::Inserted(value)
                } else {
                    let existing = occupied.get();
                    existing.touch(now);
                    self.metrics.record_lost_race();
                    Installed::AlreadyPresent(existing.value.clone())
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value.clone(), now));
                self.metrics.record_insert();
                Installed::Inserted(value)
            }
        }
    }

    fn maybe_sweep(&self) {
        let now = self.now_nanos();
        let due = self.next_sweep.load(Ordering::Acquire);
        if now < due {
            return;
        }
        let next = now.saturating_add(self.interval_nanos);
        if self.next_sweep.compare_exchange(due, next, Ordering::AcqRel, Ordering::Relaxed).is_ok()
        {
            self.sweep_at(now);
        }
    }

    fn sweep_at(&self, start: u64) -> SweepReport {
        let idle = self.idle_nanos;

        let mut expired = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_idle(start, idle);
            if !keep {
                expired += 1;
            }
            keep
        });

        let mut evicted = 0;
        let max = self.config.max_entries;
        let len = self.entries.len();
        if len > max {
            let mut oldest: Vec<(u64, K)> = self
                .entries
                .iter()
                .map(|entry| (entry.last_access(), entry.key().clone()))
                .collect();
            oldest.sort_by_key(|(last_access, _)| *last_access);

            let mut excess = len - max;
            for (_, key) in oldest {
                if excess == 0 {
                    break;
                }
                if self.entries.remove_if(&key, |_, entry| entry.last_access() <= start).is_some() {
                    evicted += 1;
                    excess -= 1;
                }
            }
        }

        self.metrics.record_expirations(expired);
        self.metrics.record_evictions(evicted);
        self.metrics.record_sweep();

        let report = SweepReport { expired, evicted };
        if report.removed() > 0 {
            debug!(expired, evicted, remaining = self.entries.len(), "expiring cache swept");
        } else {
            trace!(size = self.entries.len(), "expiring cache sweep found nothing to remove");
        }
        report
    }
}

impl<K, V, C> fmt::Debug for ExpiringCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("len", &self.entries.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::expiring.
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::clock::MockClock;

    fn cache_with(
        idle_ms: u64,
        max_entries: usize,
        sweep_ms: u64,
    ) -> (ExpiringCache<String, u64, MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = ExpiringCacheConfig::builder()
            .idle_expiry(Duration::from_millis(idle_ms))
            .max_entries(max_entries)
            .sweep_interval(Duration::from_millis(sweep_ms))
            .build()
            .unwrap();
        (ExpiringCache::with_clock(config, clock.clone()).unwrap(), clock)
    }

    /// Validates `ExpiringCache::get_or_create` behavior for the existing key
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the first call installs the factory result.
    /// - Confirms the second call returns the installed value without
    ///   invoking its factory.
    #[test]
    fn test_get_or_create_reuses_live_value() {
        let (cache, _) = cache_with(1000, 10, 100);
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_create("a".to_string(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            1
        });
        let second = cache.get_or_create("a".to_string(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            2
        });

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_factory_receives_key() {
        let (cache, _) = cache_with(1000, 10, 100);
        let value = cache.get_or_create("abc".to_string(), |key| key.len() as u64);
        assert_eq!(value, 3);
    }

    /// Validates that a failing factory installs nothing.
    ///
    /// Assertions:
    /// - Confirms the error is returned to the caller.
    /// - Ensures the cache is still empty afterwards.
    #[test]
    fn test_factory_error_propagates() {
        let (cache, _) = cache_with(1000, 10, 100);

        let result: Result<u64, String> =
            cache.get_or_try_create("a".to_string(), |_| Err("boom".to_string()));

        assert_eq!(result, Err("boom".to_string()));
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_try_create("a".to_string(), |_| Ok::<_, String>(5)), Ok(5));
    }

    #[test]
    fn test_try_install_reports_race_outcome() {
        let (cache, _) = cache_with(1000, 10, 100);

        assert_eq!(cache.try_install("k".to_string(), 1), Installed::Inserted(1));
        let second = cache.try_install("k".to_string(), 2);
        assert_eq!(second, Installed::AlreadyPresent(1));
        assert!(!second.was_inserted());
        assert_eq!(second.into_inner(), 1);
        assert_eq!(cache.stats().lost_races, 1);
    }

    /// Validates idle expiry on lookup before any sweep has run.
    ///
    /// Assertions:
    /// - Confirms an entry idle past the expiry reads as absent.
    /// - Confirms the factory is invoked again to recreate it.
    #[test]
    fn test_idle_entry_is_recreated() {
        let (cache, clock) = cache_with(1000, 10, 10_000);

        assert_eq!(cache.get_or_create("a".to_string(), |_| 1), 1);
        clock.advance_millis(1001);

        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get_or_create("a".to_string(), |_| 2), 2);
    }

    #[test]
    fn test_entry_exactly_at_expiry_is_live() {
        let (cache, clock) = cache_with(1000, 10, 10_000);

        cache.get_or_create("a".to_string(), |_| 1);
        clock.advance_millis(1000);

        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    /// Validates that touching an entry keeps it alive while an untouched
    /// neighbour expires during an amortized sweep.
    ///
    /// Assertions:
    /// - Confirms the touched key survives with its original value.
    /// - Confirms the untouched key was removed by the sweep.
    #[test]
    fn test_touched_entry_survives_sweep() {
        let (cache, clock) = cache_with(1000, 10, 100);

        cache.get_or_create("a".to_string(), |_| 1);
        cache.get_or_create("b".to_string(), |_| 2);

        clock.advance_millis(600);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        clock.advance_millis(600);
        // Triggers the amortized sweep.
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        assert_eq!(cache.len(), 1);
        assert!(!cache.contains_key(&"b".to_string()));
        assert_eq!(cache.stats().expirations, 1);
    }

    /// Validates capacity eviction ordering.
    ///
    /// Assertions:
    /// - Confirms the sweep evicts the entries with the oldest access first.
    /// - Confirms the cache ends at its cap.
    #[test]
    fn test_capacity_eviction_removes_oldest() {
        let (cache, clock) = cache_with(60_000, 2, 60_000);

        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.get_or_create((*key).to_string(), |_| i as u64);
            clock.advance_millis(10);
        }
        // Refresh "a" so "b" and "c" are the oldest.
        assert_eq!(cache.get(&"a".to_string()), Some(0));
        clock.advance_millis(10);

        let report = cache.sweep();

        assert_eq!(report, SweepReport { expired: 0, evicted: 2 });
        assert_eq!(cache.len(), 2);
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "d".to_string()]);
    }

    /// Validates capacity eviction skips entries touched after the sweep
    /// started.
    ///
    /// # Test Steps
    /// 1. Fill a cache capped at 1 with "a", "b" and "c" at t=0
    /// 2. Note the sweep start, then touch "b" and "c" at t=10
    /// 3. Sweep as of the earlier start
    /// 4. Verify only "a" is evicted and the cache stays above its cap
    #[test]
    fn test_capacity_eviction_skips_entries_touched_after_start() {
        let (cache, clock) = cache_with(60_000, 1, 60_000);

        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache.get_or_create((*key).to_string(), |_| i as u64);
        }
        let start = cache.now_nanos();

        clock.advance_millis(10);
        assert_eq!(cache.get(&"b".to_string()), Some(1));
        assert_eq!(cache.get(&"c".to_string()), Some(2));

        let report = cache.sweep_at(start);

        assert_eq!(report, SweepReport { expired: 0, evicted: 1 });
        assert_eq!(cache.len(), 2);
        assert!(cache.stats().fill_percentage() > 1.0);
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["b".to_string(), "c".to_string()]);

        // The next sweep starts after the touches and restores the cap.
        clock.advance_millis(10);
        assert_eq!(cache.sweep(), SweepReport { expired: 0, evicted: 1 });
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_expires_before_evicting() {
        let (cache, clock) = cache_with(100, 2, 60_000);

        cache.get_or_create("old".to_string(), |_| 0);
        clock.advance_millis(150);
        cache.get_or_create("x".to_string(), |_| 1);
        cache.get_or_create("y".to_string(), |_| 2);

        let report = cache.sweep();
        assert_eq!(report, SweepReport { expired: 1, evicted: 0 });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_values_snapshot_skips_idle_entries() {
        let (cache, clock) = cache_with(100, 10, 60_000);

        cache.get_or_create("a".to_string(), |_| 1);
        clock.advance_millis(200);
        cache.get_or_create("b".to_string(), |_| 2);

        assert_eq!(cache.values(), vec![2]);
        assert_eq!(cache.entries(), vec![("b".to_string(), 2)]);
        // Idle but not yet swept.
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let (cache, clock) = cache_with(100, 10, 60_000);

        cache.get_or_create("a".to_string(), |_| 1);
        clock.advance_millis(60);
        assert_eq!(cache.peek(&"a".to_string()), Some(1));
        clock.advance_millis(60);

        assert_eq!(cache.peek(&"a".to_string()), None);
        assert!(!cache.contains_key(&"a".to_string()));
    }

    #[test]
    fn test_remove_and_clear() {
        let (cache, _) = cache_with(1000, 10, 100);
        cache.get_or_create("a".to_string(), |_| 1);
        cache.get_or_create("b".to_string(), |_| 2);

        assert_eq!(cache.remove(&"a".to_string()), Some(1));
        assert_eq!(cache.remove(&"a".to_string()), None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_tracking() {
        let (cache, _) = cache_with(1000, 10, 100);

        cache.get_or_create("a".to_string(), |_| 1); // miss + insert
        cache.get_or_create("a".to_string(), |_| 1); // hit
        let _ = cache.get(&"zzz".to_string()); // miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 10);
    }

    /// Validates that racing callers converge on a single value.
    ///
    /// Assertions:
    /// - Confirms every thread observed the same value.
    /// - Confirms exactly one entry exists for the key.
    #[test]
    fn test_concurrent_get_or_create_converges() {
        let cache: Arc<ExpiringCache<String, Arc<AtomicUsize>>> =
            Arc::new(ExpiringCache::new(ExpiringCacheConfig::default()).unwrap());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let value =
                        cache.get_or_create("shared".to_string(), |_| Arc::new(AtomicUsize::new(0)));
                    value.fetch_add(1, Ordering::SeqCst);
                    value
                })
            })
            .collect();

        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.len(), 1);
        let live = cache.get(&"shared".to_string()).unwrap();
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &live)));
        assert_eq!(live.load(Ordering::SeqCst), 16);
    }
}
