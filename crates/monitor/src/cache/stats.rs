//! Cache statistics
//!
//! Fields are independent relaxed atomics; a snapshot is not a consistent cut
//! across fields.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time counters of an [`ExpiringCache`](super::ExpiringCache)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries stored, idle ones not yet swept included
    pub size: usize,

    /// Configured entry cap
    pub max_size: usize,

    /// Lookups that found a live entry
    pub hits: u64,

    /// Lookups that found nothing (or only an expired entry)
    pub misses: u64,

    /// Values installed by a factory
    pub inserts: u64,

    /// Factory results discarded because another caller installed first
    pub lost_races: u64,

    /// Entries removed for being idle too long
    pub expirations: u64,

    /// Entries removed to enforce the size cap
    pub evictions: u64,

    /// Completed sweeps
    pub sweeps: u64,
}

impl CacheStats {
    /// Share of lookups served from a live entry, 0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    /// Lookups so far
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// `size / max_size`; above 1.0 while a sweep is pending
    pub fn fill_percentage(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }
        self.size as f64 / self.max_size as f64
    }

    /// Entries removed by sweeps and lookups, for any reason
    pub fn removed(&self) -> u64 {
        self.expirations + self.evictions
    }
}

#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    lost_races: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
    sweeps: AtomicU64,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(by as u64, Ordering::Relaxed);
}

impl MetricsCollector {
    pub(crate) fn record_hit(&self) {
        bump(&self.hits, 1);
    }

    pub(crate) fn record_miss(&self) {
        bump(&self.misses, 1);
    }

    pub(crate) fn record_insert(&self) {
        bump(&self.inserts, 1);
    }

    pub(crate) fn record_lost_race(&self) {
        bump(&self.lost_races, 1);
    }

    pub(crate) fn record_expirations(&self, count: usize) {
        bump(&self.expirations, count);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        bump(&self.evictions, count);
    }

    pub(crate) fn record_sweep(&self) {
        bump(&self.sweeps, 1);
    }

    pub(crate) fn snapshot(&self, size: usize, max_size: usize) -> CacheStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            size,
            max_size,
            hits: read(&self.hits),
            misses: read(&self.misses),
            inserts: read(&self.inserts),
            lost_races: read(&self.lost_races),
            expirations: read(&self.expirations),
            evictions: read(&self.evictions),
            sweeps: read(&self.sweeps),
        }
    }
}
