//! Dynamic, self-expiring monitor registry.
//!
//! Call sites update counters and timers by name and tags without declaring
//! them first. The registry creates each monitor on first use and drops it
//! after it has gone unused for a configurable idle period, so metric names
//! built from request data cannot grow memory without bound.
//!
//! # Layers
//!
//! - [`cache`]: concurrent get-or-create cache with idle expiry and a size cap
//! - [`monitor`]: resettable counter and composite timer (count, total, min,
//!   max), each statistic independently resettable
//! - [`registry`]: the [`DynamicRegistry`] facade tying the two together
//!
//! # Features
//!
//! - `runtime`: background sweeper tasks on the current Tokio runtime
//!
//! ```
//! use dynmon::{DynamicRegistry, RegistryConfig, TagList, TimeUnit};
//!
//! let registry = DynamicRegistry::new(RegistryConfig::default())?;
//! registry.record("db.query", &TagList::new().with("table", "users"), 4.2, TimeUnit::Milliseconds)?;
//!
//! for monitor in registry.monitors() {
//!     println!("{} = {}", monitor.config(), monitor.value());
//! }
//! # Ok::<(), dynmon::MonitorError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod clock;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod tag;
pub mod utils;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use cache::{ExpiringCache, ExpiringCacheConfig};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{ErrorClassification, ErrorSeverity, MonitorError, MonitorResult};
pub use monitor::{
    BasicTimer, CompositeMonitor, Monitor, ResettableCounter, ResettableMonitor, TimeUnit,
};
pub use registry::{DynamicRegistry, RegistryConfig};
pub use tag::{MonitorConfig, Tag, TagList};
pub use utils::serde::duration_millis;
