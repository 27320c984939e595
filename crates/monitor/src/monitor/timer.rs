//! Composite timer
//!
//! A [`BasicTimer`] folds duration observations into four statistics: count,
//! total time, min and max. Each statistic is its own atomic accumulator and
//! can be reset on its own schedule; for example a publisher may drain count
//! and total every interval for rates while min and max keep a longer window.
//!
//! [`BasicTimer::value`] is the mean of the live count and total. There is no
//! transaction across accumulators: during concurrent `record` calls a reader
//! may see a total that already includes an observation the count does not
//! yet reflect (or the reverse). Monitoring tolerates this; readers needing an
//! exact pair must quiesce writers.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::stat::{CountStat, MaxStat, MinStat, TotalStat};
use super::stopwatch::Stopwatch;
use super::unit::TimeUnit;
use super::{CompositeMonitor, Monitor, ResettableMonitor, TIMER};
use crate::clock::{Clock, SystemClock};
use crate::error::{MonitorError, MonitorResult};
use crate::tag::{MonitorConfig, TYPE_TAG, UNIT_TAG};

/// Timer aggregating durations into count, total, min and max
///
/// # Example
/// ```
/// use dynmon::monitor::{BasicTimer, Monitor, TimeUnit};
/// use dynmon::tag::MonitorConfig;
///
/// let timer = BasicTimer::new(MonitorConfig::new("rpc")?);
/// timer.record(42.0, TimeUnit::Milliseconds)?;
/// timer.record(21.0, TimeUnit::Milliseconds)?;
///
/// assert_eq!(timer.count(), 2);
/// assert_eq!(timer.total_time(), 63.0);
/// assert_eq!(timer.value(), 31.5);
/// assert!(timer.record(-1.0, TimeUnit::Milliseconds).is_err());
/// # Ok::<(), dynmon::MonitorError>(())
/// ```
#[derive(Debug)]
pub struct BasicTimer {
    config: MonitorConfig,
    unit: TimeUnit,
    count: CountStat,
    total: TotalStat,
    min: MinStat,
    max: MaxStat,
}

impl BasicTimer {
    /// Create a timer reporting in milliseconds
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_unit(config, TimeUnit::Milliseconds)
    }

    /// Create a timer reporting in `unit`
    pub fn with_unit(config: MonitorConfig, unit: TimeUnit) -> Self {
        let config = Self::config_for(&config, unit);
        Self {
            count: CountStat::new(&config),
            total: TotalStat::new(&config),
            min: MinStat::new(&config),
            max: MaxStat::new(&config),
            config,
            unit,
        }
    }

    /// The config a timer built from `config` and `unit` reports
    pub fn config_for(config: &MonitorConfig, unit: TimeUnit) -> MonitorConfig {
        config.with_tag(TYPE_TAG, TIMER).with_tag(UNIT_TAG, unit.as_str())
    }

    /// Record one observation of `amount` expressed in `unit`
    ///
    /// Negative, NaN and infinite amounts are rejected without touching any
    /// statistic, as are amounts that overflow when converted to the timer's
    /// unit.
    pub fn record(&self, amount: f64, unit: TimeUnit) -> MonitorResult<()> {
        validate_amount(amount)?;
        let converted = self.unit.convert(amount, unit);
        if !converted.is_finite() {
            return Err(MonitorError::invalid_duration(amount));
        }
        self.observe(converted);
        Ok(())
    }

    /// Record one observation given as a `Duration`
    pub fn record_duration(&self, duration: Duration) {
        self.observe(self.unit.convert_duration(duration));
    }

    /// Start timing with the system clock; see [`Stopwatch`]
    pub fn start(&self) -> Stopwatch<'_, SystemClock> {
        self.start_with(SystemClock)
    }

    /// Start timing with a custom clock
    pub fn start_with<C: Clock>(&self, clock: C) -> Stopwatch<'_, C> {
        Stopwatch::new(self, clock)
    }

    fn observe(&self, amount: f64) {
        self.total.add(amount);
        self.count.increment();
        self.min.update(amount);
        self.max.update(amount);
    }

    /// Canonical unit of every statistic
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Observations since the count was last reset
    pub fn count(&self) -> u64 {
        self.count.count()
    }

    /// Total recorded time since the total was last reset
    pub fn total_time(&self) -> f64 {
        self.total.total()
    }

    /// Smallest observation since min was last reset, 0 if none
    pub fn min(&self) -> f64 {
        self.min.min()
    }

    /// Largest observation since max was last reset, 0 if none
    pub fn max(&self) -> f64 {
        self.max.max()
    }

    /// Capture every statistic without resetting anything
    pub fn snapshot_stats(&self) -> TimerSnapshot {
        TimerSnapshot {
            config: self.config.clone(),
            unit: self.unit,
            count: self.count(),
            total_time: self.total_time(),
            min: self.min(),
            max: self.max(),
            mean: self.value(),
        }
    }
}

impl Monitor for BasicTimer {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Mean observation: total / count, or 0 with no observations
    fn value(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.total_time() / count as f64
        }
    }
}

impl CompositeMonitor for BasicTimer {
    fn monitors(&self) -> Vec<&dyn ResettableMonitor> {
        vec![&self.count, &self.total, &self.min, &self.max]
    }
}

/// Equal when configs match and counts match; totals and extremes are ignored
impl PartialEq for BasicTimer {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.count() == other.count()
    }
}

impl fmt::Display for BasicTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BasicTimer{{config={}, count={}, totalTime={}, min={}, max={}}}",
            self.config,
            self.count(),
            self.total_time(),
            self.min(),
            self.max()
        )
    }
}

/// Reject negative, NaN and infinite observations
pub(crate) fn validate_amount(amount: f64) -> MonitorResult<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(MonitorError::invalid_duration(amount))
    }
}

/// All statistics of a timer at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    /// Timer identity
    pub config: MonitorConfig,
    /// Unit of every value below
    pub unit: TimeUnit,
    /// Observation count
    pub count: u64,
    /// Sum of observations
    pub total_time: f64,
    /// Smallest observation
    pub min: f64,
    /// Largest observation
    pub max: f64,
    /// `total_time / count`
    pub mean: f64,
}
