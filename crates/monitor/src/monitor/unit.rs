//! Time units for timer observations
//!
//! Conversions are done in `f64` so sub-unit observations survive: 1000
//! nanoseconds recorded on a millisecond timer are `0.001`, not `0`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unit of a recorded duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    /// 10^-9 seconds
    Nanoseconds,
    /// 10^-6 seconds
    Microseconds,
    /// 10^-3 seconds
    #[default]
    Milliseconds,
    /// Seconds
    Seconds,
    /// 60 seconds
    Minutes,
    /// 3600 seconds
    Hours,
    /// 86400 seconds
    Days,
}

impl TimeUnit {
    /// Length of one unit in nanoseconds
    pub const fn nanos_per_unit(self) -> f64 {
        match self {
            Self::Nanoseconds => 1.0,
            Self::Microseconds => 1e3,
            Self::Milliseconds => 1e6,
            Self::Seconds => 1e9,
            Self::Minutes => 60e9,
            Self::Hours => 3_600e9,
            Self::Days => 86_400e9,
        }
    }

    /// Convert `amount` expressed in `from` into this unit
    ///
    /// ```
    /// use dynmon::monitor::TimeUnit;
    ///
    /// assert_eq!(TimeUnit::Milliseconds.convert(1000.0, TimeUnit::Nanoseconds), 0.001);
    /// assert_eq!(TimeUnit::Milliseconds.convert(2.0, TimeUnit::Seconds), 2000.0);
    /// ```
    pub fn convert(self, amount: f64, from: Self) -> f64 {
        if self == from {
            amount
        } else {
            amount * from.nanos_per_unit() / self.nanos_per_unit()
        }
    }

    /// Express a `Duration` in this unit
    pub fn convert_duration(self, duration: Duration) -> f64 {
        self.convert(duration.as_nanos() as f64, Self::Nanoseconds)
    }

    /// Upper-case name, as used in the `unit` tag
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "NANOSECONDS",
            Self::Microseconds => "MICROSECONDS",
            Self::Milliseconds => "MILLISECONDS",
            Self::Seconds => "SECONDS",
            Self::Minutes => "MINUTES",
            Self::Hours => "HOURS",
            Self::Days => "DAYS",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
