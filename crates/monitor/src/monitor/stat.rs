//! Independently resettable timer statistics
//!
//! Each statistic owns one atomic accumulator. Reading and resetting one of
//! them is a single atomic swap and never touches its siblings.

use std::sync::atomic::{AtomicU64, Ordering};

use super::atomic::AtomicF64;
use super::{Monitor, ResettableMonitor, GAUGE, RATE};
use crate::tag::{MonitorConfig, STATISTIC_TAG, TYPE_TAG};

fn stat_config(parent: &MonitorConfig, statistic: &str, kind: &str) -> MonitorConfig {
    parent.with_tag(STATISTIC_TAG, statistic).with_tag(TYPE_TAG, kind)
}

/// Number of observations
#[derive(Debug)]
pub struct CountStat {
    config: MonitorConfig,
    count: AtomicU64,
}

impl CountStat {
    pub(crate) fn new(parent: &MonitorConfig) -> Self {
        Self { config: stat_config(parent, "count", RATE), count: AtomicU64::new(0) }
    }

    pub(crate) fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Observations since the last reset
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

impl Monitor for CountStat {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn value(&self) -> f64 {
        self.count() as f64
    }
}

impl ResettableMonitor for CountStat {
    fn get_and_reset(&self) -> f64 {
        self.count.swap(0, Ordering::AcqRel) as f64
    }
}

/// Sum of observations
#[derive(Debug)]
pub struct TotalStat {
    config: MonitorConfig,
    total: AtomicF64,
}

impl TotalStat {
    pub(crate) fn new(parent: &MonitorConfig) -> Self {
        Self { config: stat_config(parent, "totalTime", RATE), total: AtomicF64::new(0.0) }
    }

    pub(crate) fn add(&self, amount: f64) {
        self.total.fetch_add(amount);
    }

    /// Sum since the last reset
    pub fn total(&self) -> f64 {
        self.total.load()
    }
}

impl Monitor for TotalStat {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn value(&self) -> f64 {
        self.total()
    }
}

impl ResettableMonitor for TotalStat {
    fn get_and_reset(&self) -> f64 {
        self.total.swap(0.0)
    }
}

/// Smallest observation; reads as 0 when nothing was recorded
#[derive(Debug)]
pub struct MinStat {
    config: MonitorConfig,
    min: AtomicF64,
}

impl MinStat {
    pub(crate) fn new(parent: &MonitorConfig) -> Self {
        Self { config: stat_config(parent, "min", GAUGE), min: AtomicF64::new(f64::INFINITY) }
    }

    pub(crate) fn update(&self, amount: f64) {
        self.min.fetch_min(amount);
    }

    /// Smallest observation since the last reset
    pub fn min(&self) -> f64 {
        or_zero(self.min.load())
    }
}

impl Monitor for MinStat {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn value(&self) -> f64 {
        self.min()
    }
}

impl ResettableMonitor for MinStat {
    fn get_and_reset(&self) -> f64 {
        or_zero(self.min.swap(f64::INFINITY))
    }
}

/// Largest observation; reads as 0 when nothing was recorded
#[derive(Debug)]
pub struct MaxStat {
    config: MonitorConfig,
    max: AtomicF64,
}

impl MaxStat {
    pub(crate) fn new(parent: &MonitorConfig) -> Self {
        Self { config: stat_config(parent, "max", GAUGE), max: AtomicF64::new(f64::NEG_INFINITY) }
    }

    pub(crate) fn update(&self, amount: f64) {
        self.max.fetch_max(amount);
    }

    /// Largest observation since the last reset
    pub fn max(&self) -> f64 {
        or_zero(self.max.load())
    }
}

impl Monitor for MaxStat {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn value(&self) -> f64 {
        self.max()
    }
}

impl ResettableMonitor for MaxStat {
    fn get_and_reset(&self) -> f64 {
        or_zero(self.max.swap(f64::NEG_INFINITY))
    }
}

/// Map the empty sentinels (±infinity) to 0
fn or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
