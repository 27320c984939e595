//! Dynamic monitor registry
//!
//! [`DynamicRegistry`] creates counters and timers on first use from a name
//! and a set of tags, and forgets them once they go unused for the configured
//! idle period. Call sites never declare monitors up front:
//!
//! ```
//! use dynmon::monitor::TimeUnit;
//! use dynmon::registry::{DynamicRegistry, RegistryConfig};
//! use dynmon::tag::TagList;
//!
//! let registry = DynamicRegistry::new(RegistryConfig::default())?;
//! let tags = TagList::new().with("route", "/users");
//!
//! registry.increment("http.requests", &tags)?;
//! registry.increment_pairs("http.requests", &["route", "/users"])?;
//! registry.record("http.latency", &tags, 12.5, TimeUnit::Milliseconds)?;
//!
//! assert_eq!(registry.counter("http.requests", &tags)?.count(), 2);
//! assert!(registry.increment_pairs("http.requests", &["route"]).is_err());
//! # Ok::<(), dynmon::MonitorError>(())
//! ```
//!
//! Counters and timers live in two [`ExpiringCache`]s keyed by the monitor's
//! full config, implicit `type`/`unit` tags included, so the key of an entry
//! is always equal to the config the monitor reports.

mod config;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

pub use config::{RegistryConfig, RegistryConfigBuilder};

use crate::cache::{CacheStats, ExpiringCache, SweepReport};
use crate::clock::{Clock, SystemClock};
use crate::error::{MonitorError, MonitorResult};
use crate::monitor::{validate_amount, BasicTimer, Monitor, ResettableCounter, TimeUnit};
use crate::tag::{MonitorConfig, TagList};

/// Cache of dynamically created counters
pub type CounterCache<C = SystemClock> = ExpiringCache<MonitorConfig, Arc<ResettableCounter>, C>;
/// Cache of dynamically created timers
pub type TimerCache<C = SystemClock> = ExpiringCache<MonitorConfig, Arc<BasicTimer>, C>;

/// Registry of counters and timers created on demand
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
#[derive(Debug)]
pub struct DynamicRegistry<C: Clock = SystemClock> {
    counters: CounterCache<C>,
    timers: TimerCache<C>,
    default_unit: TimeUnit,
}

/// Cache statistics of both registry caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Counter cache
    pub counters: CacheStats,
    /// Timer cache
    pub timers: CacheStats,
}

impl DynamicRegistry<SystemClock> {
    /// Create a registry reading the system clock
    pub fn new(config: RegistryConfig) -> MonitorResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> DynamicRegistry<C> {
    /// Create a registry with a custom clock shared by both caches
    pub fn with_clock(config: RegistryConfig, clock: C) -> MonitorResult<Self>
    where
        C: Clone,
    {
        config.validate()?;
        Ok(Self {
            counters: ExpiringCache::with_clock(config.counters, clock.clone())?,
            timers: ExpiringCache::with_clock(config.timers, clock)?,
            default_unit: config.default_unit,
        })
    }

    /// Create a registry over caches built by the caller
    ///
    /// `record_duration` reports in milliseconds.
    pub fn with_caches(counters: CounterCache<C>, timers: TimerCache<C>) -> Self {
        Self { counters, timers, default_unit: TimeUnit::default() }
    }

    /// Add one to the counter `name` with `tags`
    pub fn increment(&self, name: &str, tags: &TagList) -> MonitorResult<()> {
        self.increment_by(name, 1, tags)
    }

    /// Add one to the counter `name` with no tags beyond `type=RATE`
    pub fn increment_untagged(&self, name: &str) -> MonitorResult<()> {
        self.increment_by(name, 1, &TagList::new())
    }

    /// Add `amount` to the counter `name` with `tags`
    pub fn increment_by(&self, name: &str, amount: u64, tags: &TagList) -> MonitorResult<()> {
        let counter = self.counter(name, tags)?;
        counter.increment_by(amount);
        Ok(())
    }

    /// Add one to a counter whose tags are given as flattened `key, value`
    /// strings
    pub fn increment_pairs<S: AsRef<str>>(&self, name: &str, pairs: &[S]) -> MonitorResult<()> {
        self.increment_by_pairs(name, 1, pairs)
    }

    /// Add `amount` to a counter whose tags are given as flattened
    /// `key, value` strings
    ///
    /// An odd number of strings is rejected and no counter is created.
    pub fn increment_by_pairs<S: AsRef<str>>(
        &self,
        name: &str,
        amount: u64,
        pairs: &[S],
    ) -> MonitorResult<()> {
        let tags = tags_from_pairs(name, pairs)
            .inspect_err(|err| warn!(monitor = name, error = %err, "rejected counter update"))?;
        self.increment_by(name, amount, &tags)
    }

    /// Record `amount`, expressed in `unit`, on the timer `name` with `tags`
    ///
    /// The timer reports in `unit`. Negative, NaN and infinite amounts are
    /// rejected before any timer is created.
    pub fn record(
        &self,
        name: &str,
        tags: &TagList,
        amount: f64,
        unit: TimeUnit,
    ) -> MonitorResult<()> {
        validate_amount(amount)
            .inspect_err(|err| warn!(monitor = name, error = %err, "rejected timer update"))?;
        self.timer(name, tags, unit)?.record(amount, unit)
    }

    /// Record on a timer whose tags are given as flattened `key, value`
    /// strings
    pub fn record_pairs<S: AsRef<str>>(
        &self,
        name: &str,
        pairs: &[S],
        amount: f64,
        unit: TimeUnit,
    ) -> MonitorResult<()> {
        let tags = tags_from_pairs(name, pairs)
            .inspect_err(|err| warn!(monitor = name, error = %err, "rejected timer update"))?;
        self.record(name, &tags, amount, unit)
    }

    /// Record a `Duration` on the timer `name` in the registry's default unit
    pub fn record_duration(
        &self,
        name: &str,
        tags: &TagList,
        duration: Duration,
    ) -> MonitorResult<()> {
        self.timer(name, tags, self.default_unit)?.record_duration(duration);
        Ok(())
    }

    /// Live counter for `name` and `tags`, created if absent
    pub fn counter(&self, name: &str, tags: &TagList) -> MonitorResult<Arc<ResettableCounter>> {
        let key = counter_key(name, tags)
            .inspect_err(|err| warn!(monitor = name, error = %err, "rejected counter lookup"))?;
        Ok(self.counters.get_or_create(key, |key| {
            debug!(monitor = %key, "creating dynamic counter");
            Arc::new(ResettableCounter::new(key.clone()))
        }))
    }

    /// Live timer for `name`, `tags` and `unit`, created if absent
    pub fn timer(
        &self,
        name: &str,
        tags: &TagList,
        unit: TimeUnit,
    ) -> MonitorResult<Arc<BasicTimer>> {
        let key = timer_key(name, tags, unit)
            .inspect_err(|err| warn!(monitor = name, error = %err, "rejected timer lookup"))?;
        Ok(self.timers.get_or_create(key, |key| {
            debug!(monitor = %key, "creating dynamic timer");
            Arc::new(BasicTimer::with_unit(key.clone(), unit))
        }))
    }

    /// Existing live counter, without creating one or refreshing its access
    pub fn find_counter(&self, name: &str, tags: &TagList) -> Option<Arc<ResettableCounter>> {
        let key = counter_key(name, tags).ok()?;
        self.counters.peek(&key)
    }

    /// Existing live timer, without creating one or refreshing its access
    pub fn find_timer(
        &self,
        name: &str,
        tags: &TagList,
        unit: TimeUnit,
    ) -> Option<Arc<BasicTimer>> {
        let key = timer_key(name, tags, unit).ok()?;
        self.timers.peek(&key)
    }

    /// Snapshot of every live counter
    pub fn counters(&self) -> Vec<Arc<ResettableCounter>> {
        self.counters.values()
    }

    /// Snapshot of every live timer
    pub fn timers(&self) -> Vec<Arc<BasicTimer>> {
        self.timers.values()
    }

    /// Snapshot of every live monitor, counters first
    pub fn monitors(&self) -> Vec<Arc<dyn Monitor>> {
        let counters = self.counters().into_iter().map(|c| c as Arc<dyn Monitor>);
        let timers = self.timers().into_iter().map(|t| t as Arc<dyn Monitor>);
        counters.chain(timers).collect()
    }

    /// Unit used by [`record_duration`](Self::record_duration)
    pub fn default_unit(&self) -> TimeUnit {
        self.default_unit
    }

    /// Sweep both caches now
    pub fn sweep(&self) -> SweepReport {
        let counters = self.counters.sweep();
        let timers = self.timers.sweep();
        SweepReport {
            expired: counters.expired + timers.expired,
            evicted: counters.evicted + timers.evicted,
        }
    }

    /// Statistics of both caches
    pub fn stats(&self) -> RegistryStats {
        RegistryStats { counters: self.counters.stats(), timers: self.timers.stats() }
    }

    /// Spawn one task on the current Tokio runtime sweeping both caches
    /// every `period`; exits once the registry is dropped
    #[cfg(feature = "runtime")]
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        period: Duration,
    ) -> Option<tokio::task::JoinHandle<()>> {
        crate::cache::spawn_periodic(self, period, "dynamic registry", |registry| {
            registry.sweep();
        })
    }
}

fn tags_from_pairs<S: AsRef<str>>(name: &str, pairs: &[S]) -> MonitorResult<TagList> {
    TagList::from_pairs(pairs).ok_or_else(|| MonitorError::odd_tag_pairs(name, pairs.len()))
}

fn counter_key(name: &str, tags: &TagList) -> MonitorResult<MonitorConfig> {
    let base = MonitorConfig::with_tags(name, tags.clone())?;
    Ok(ResettableCounter::config_for(&base))
}

fn timer_key(name: &str, tags: &TagList, unit: TimeUnit) -> MonitorResult<MonitorConfig> {
    let base = MonitorConfig::with_tags(name, tags.clone())?;
    Ok(BasicTimer::config_for(&base, unit))
}
