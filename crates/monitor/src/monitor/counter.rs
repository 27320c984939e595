//! Resettable counter

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Monitor, ResettableMonitor, RATE};
use crate::tag::{MonitorConfig, TYPE_TAG};

/// Monotonic counter that can be drained with [`get_and_reset`]
///
/// The config always carries `type=RATE`.
///
/// [`get_and_reset`]: ResettableMonitor::get_and_reset
#[derive(Debug)]
pub struct ResettableCounter {
    config: MonitorConfig,
    count: AtomicU64,
}

impl ResettableCounter {
    /// Create a counter at zero
    pub fn new(config: MonitorConfig) -> Self {
        Self { config: Self::config_for(&config), count: AtomicU64::new(0) }
    }

    /// The config a counter built from `config` reports
    pub fn config_for(config: &MonitorConfig) -> MonitorConfig {
        config.with_tag(TYPE_TAG, RATE)
    }

    /// Add one
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Add `amount`
    pub fn increment_by(&self, amount: u64) {
        self.count.fetch_add(amount, Ordering::AcqRel);
    }

    /// Count since creation or the last reset
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

impl Monitor for ResettableCounter {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn value(&self) -> f64 {
        self.count() as f64
    }
}

impl ResettableMonitor for ResettableCounter {
    fn get_and_reset(&self) -> f64 {
        self.count.swap(0, Ordering::AcqRel) as f64
    }
}

/// Equal when configs match and counts match
impl PartialEq for ResettableCounter {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.count() == other.count()
    }
}

impl fmt::Display for ResettableCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResettableCounter{{config={}, count={}}}", self.config, self.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(name: &str) -> ResettableCounter {
        ResettableCounter::new(MonitorConfig::new(name).unwrap())
    }

    #[test]
    fn test_has_rate_type_tag() {
        let c = counter("requests");
        assert_eq!(c.config().tags().get(TYPE_TAG), Some("RATE"));
        assert_eq!(c.config().name(), "requests");
    }

    #[test]
    fn test_increment() {
        let c = counter("requests");
        c.increment();
        assert_eq!(c.count(), 1);
        c.increment_by(13);
        assert_eq!(c.count(), 14);
        assert_eq!(c.value(), 14.0);
    }

    #[test]
    fn test_get_and_reset() {
        let c = counter("requests");
        c.increment_by(5);
        assert_eq!(c.get_and_reset(), 5.0);
        assert_eq!(c.count(), 0);
        c.increment();
        assert_eq!(c.count(), 1);
    }

    #[test]
    fn test_equality_by_config_and_count() {
        let a = counter("requests");
        let b = counter("requests");
        assert_eq!(a, b);

        a.increment();
        assert_ne!(a, b);
        b.increment();
        assert_eq!(a, b);
        assert_ne!(a, counter("other"));
    }

    #[test]
    fn test_display() {
        let c = counter("requests");
        c.increment_by(3);
        assert_eq!(c.to_string(), "ResettableCounter{config=requests{type=RATE}, count=3}");
    }
}
