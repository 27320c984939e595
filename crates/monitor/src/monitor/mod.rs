//! Monitors: counters, timers and their resettable statistics
//!
//! Every monitor exposes a [`MonitorConfig`] and a numeric value. Monitors that
//! support an atomic read-and-clear implement [`ResettableMonitor`]; monitors
//! built from several statistics implement [`CompositeMonitor`] and list their
//! resettable parts, so reset tooling can walk them without knowing the
//! concrete type.
//!
//! ```
//! use dynmon::monitor::{reset_all, BasicTimer, Monitor, TimeUnit};
//! use dynmon::tag::MonitorConfig;
//!
//! let timer = BasicTimer::new(MonitorConfig::new("db.query")?);
//! timer.record(42.0, TimeUnit::Milliseconds)?;
//!
//! let drained = reset_all(&timer);
//! assert_eq!(drained.len(), 4);
//! // Resetting the sub-statistics never touches the timer's own view.
//! assert_eq!(timer.value(), 42.0);
//! # Ok::<(), dynmon::MonitorError>(())
//! ```

mod atomic;
mod counter;
mod stat;
mod stopwatch;
mod timer;
mod unit;

use std::fmt;

use serde::Serialize;

pub use counter::ResettableCounter;
pub use stat::{CountStat, MaxStat, MinStat, TotalStat};
pub use stopwatch::Stopwatch;
pub use timer::{BasicTimer, TimerSnapshot};
pub(crate) use timer::validate_amount;
pub use unit::TimeUnit;

use crate::tag::MonitorConfig;

/// `type` tag value for registry-managed counters
pub const RATE: &str = "RATE";
/// `type` tag value for point-in-time values
pub const GAUGE: &str = "GAUGE";
/// `type` tag value for composite timers
pub const TIMER: &str = "TIMER";

/// A readable numeric value with an identity
pub trait Monitor: Send + Sync + fmt::Debug {
    /// Name and tags of this monitor
    fn config(&self) -> &MonitorConfig;

    /// Current value
    fn value(&self) -> f64;

    /// Point-in-time copy of config and value
    fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot { config: self.config().clone(), value: self.value() }
    }
}

/// A monitor whose value can be atomically read and cleared
///
/// Atomic for this monitor only: resetting one statistic of a timer says
/// nothing about the others.
pub trait ResettableMonitor: Monitor {
    /// Return the current value and reset it to the initial state
    fn get_and_reset(&self) -> f64;
}

/// A monitor made of several resettable statistics
pub trait CompositeMonitor: Monitor {
    /// The constituent statistics, in a stable order
    fn monitors(&self) -> Vec<&dyn ResettableMonitor>;
}

/// Config and value captured at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    /// Identity of the monitor
    pub config: MonitorConfig,
    /// Value at capture time
    pub value: f64,
}

/// Read and reset every statistic of a composite monitor
///
/// Returns one snapshot per statistic holding the value it had before the
/// reset.
pub fn reset_all(monitor: &dyn CompositeMonitor) -> Vec<MonitorSnapshot> {
    monitor
        .monitors()
        .into_iter()
        .map(|stat| MonitorSnapshot { config: stat.config().clone(), value: stat.get_and_reset() })
        .collect()
}
