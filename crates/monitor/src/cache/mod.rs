//! Self-expiring, size-bounded get-or-create cache
//!
//! [`ExpiringCache`] maps an immutable key to a lazily built value. Each entry
//! expires after a configurable idle period and the whole cache is capped at a
//! maximum entry count, evicting the least recently accessed entries first.
//!
//! # Features
//!
//! - **Concurrent**: sharded map, hits only take a shard read lock
//! - **At most one live value per key**: racing factories converge on the
//!   installed value ([`Installed`])
//! - **Amortized eviction**: sweeps piggyback on cache calls, gated by the
//!   configured sweep interval; a background sweeper is available with the
//!   `runtime` feature
//! - **Testable**: time is read through [`Clock`](crate::clock::Clock)
//!
//! # Example
//! ```
//! use std::time::Duration;
//!
//! use dynmon::cache::{ExpiringCache, ExpiringCacheConfig};
//!
//! let config = ExpiringCacheConfig::builder()
//!     .idle_expiry(Duration::from_secs(900))
//!     .max_entries(1_000)
//!     .sweep_interval(Duration::from_secs(60))
//!     .build()?;
//!
//! let cache: ExpiringCache<String, usize> = ExpiringCache::new(config)?;
//! let len = cache.get_or_create("requests".to_string(), |key| key.len());
//! assert_eq!(len, 8);
//! # Ok::<(), dynmon::MonitorError>(())
//! ```

mod config;
mod expiring;
mod stats;
#[cfg(feature = "runtime")]
mod sweeper;

pub use expiring::{ExpiringCache, Installed, SweepReport};

pub use config::{
    ExpiringCacheConfig, ExpiringCacheConfigBuilder, DEFAULT_IDLE_EXPIRY, DEFAULT_MAX_ENTRIES,
    DEFAULT_SWEEP_INTERVAL,
};
pub use stats::CacheStats;
#[cfg(feature = "runtime")]
pub(crate) use sweeper::spawn_periodic;
