//! Expiring cache configuration and builder
//!
//! Idle expiry and the entry cap are mandatory: a cache fed by dynamic metric
//! names must always be bounded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};
use crate::utils::serde::duration_millis;

/// Default idle duration after which an untouched entry expires
pub const DEFAULT_IDLE_EXPIRY: Duration = Duration::from_secs(15 * 60);
/// Default maximum number of live entries
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;
/// Default minimum time between two eviction sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for [`ExpiringCache`](super::ExpiringCache)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiringCacheConfig {
    /// Entries idle for longer than this are removed
    #[serde(with = "duration_millis", rename = "idle_expiry_ms")]
    pub idle_expiry: Duration,

    /// Maximum number of entries kept after a sweep
    pub max_entries: usize,

    /// Minimum time between two amortized sweeps
    #[serde(with = "duration_millis", rename = "sweep_interval_ms")]
    pub sweep_interval: Duration,
}

impl Default for ExpiringCacheConfig {
    fn default() -> Self {
        Self {
            idle_expiry: DEFAULT_IDLE_EXPIRY,
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ExpiringCacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> ExpiringCacheConfigBuilder {
        ExpiringCacheConfigBuilder::default()
    }

    /// Quick preset with the given idle expiry and entry cap
    ///
    /// The sweep interval is a tenth of the idle expiry, at least 1ms.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use dynmon::cache::ExpiringCacheConfig;
    ///
    /// let config = ExpiringCacheConfig::new(Duration::from_secs(1), 100);
    /// assert_eq!(config.sweep_interval, Duration::from_millis(100));
    /// ```
    pub fn new(idle_expiry: Duration, max_entries: usize) -> Self {
        Self {
            idle_expiry,
            max_entries,
            sweep_interval: (idle_expiry / 10).max(Duration::from_millis(1)),
        }
    }

    /// Check that every bound is strictly positive
    pub fn validate(&self) -> MonitorResult<()> {
        if self.idle_expiry.is_zero() {
            return Err(MonitorError::invalid_config("idle_expiry", "must be greater than zero"));
        }
        if self.max_entries == 0 {
            return Err(MonitorError::invalid_config("max_entries", "must be greater than zero"));
        }
        if self.sweep_interval.is_zero() {
            return Err(MonitorError::invalid_config(
                "sweep_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ExpiringCacheConfig`] with fluent API
#[derive(Debug, Default)]
pub struct ExpiringCacheConfigBuilder {
    config: ExpiringCacheConfig,
}

impl ExpiringCacheConfigBuilder {
    /// Set the idle expiry
    pub fn idle_expiry(mut self, duration: Duration) -> Self {
        self.config.idle_expiry = duration;
        self
    }

    /// Set the maximum number of entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.config.max_entries = max;
        self
    }

    /// Set the minimum time between sweeps
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> MonitorResult<ExpiringCacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
