//! Registry configuration
//!
//! Counters and timers live in separate caches, each bounded on its own.

use serde::{Deserialize, Serialize};

use crate::cache::ExpiringCacheConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::monitor::TimeUnit;

/// Configuration for [`DynamicRegistry`](super::DynamicRegistry)
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use dynmon::monitor::TimeUnit;
/// use dynmon::registry::RegistryConfig;
///
/// let config = RegistryConfig::from_toml_str(
///     r#"
///     default_unit = "MICROSECONDS"
///
///     [counters]
///     idle_expiry_ms = 60000
///     max_entries = 500
///     "#,
/// )?;
///
/// assert_eq!(config.default_unit, TimeUnit::Microseconds);
/// assert_eq!(config.counters.idle_expiry, Duration::from_secs(60));
/// assert_eq!(config.timers.max_entries, 10_000);
/// # Ok::<(), dynmon::MonitorError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Cache holding dynamically created counters
    pub counters: ExpiringCacheConfig,

    /// Cache holding dynamically created timers
    pub timers: ExpiringCacheConfig,

    /// Unit used by [`record_duration`](super::DynamicRegistry::record_duration)
    pub default_unit: TimeUnit,
}

impl RegistryConfig {
    /// Create a new configuration builder
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    /// Parse a TOML document; absent fields take their defaults
    pub fn from_toml_str(source: &str) -> MonitorResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate both cache configurations
    pub fn validate(&self) -> MonitorResult<()> {
        self.counters.validate().map_err(|err| prefixed("counters", err))?;
        self.timers.validate().map_err(|err| prefixed("timers", err))
    }
}

fn prefixed(section: &str, err: MonitorError) -> MonitorError {
    match err {
        MonitorError::InvalidConfig { field, message } => {
            MonitorError::invalid_config(format!("{section}.{field}"), message)
        }
        other => other,
    }
}

/// Builder for [`RegistryConfig`]
#[derive(Debug, Default)]
pub struct RegistryConfigBuilder {
    config: RegistryConfig,
}

impl RegistryConfigBuilder {
    /// Set the counter cache configuration
    pub fn counters(mut self, counters: ExpiringCacheConfig) -> Self {
        self.config.counters = counters;
        self
    }

    /// Set the timer cache configuration
    pub fn timers(mut self, timers: ExpiringCacheConfig) -> Self {
        self.config.timers = timers;
        self
    }

    /// Use the same cache configuration for counters and timers
    pub fn caches(self, cache: ExpiringCacheConfig) -> Self {
        self.counters(cache).timers(cache)
    }

    /// Set the unit timers created by `record_duration` report in
    pub fn default_unit(mut self, unit: TimeUnit) -> Self {
        self.config.default_unit = unit;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> MonitorResult<RegistryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
