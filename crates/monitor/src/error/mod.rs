//! Error types for the monitor registry
//!
//! Every failure in this crate falls into one of two groups:
//!
//! 1. **Invalid input**: malformed key material (empty name, odd-length
//!    flattened tag list), invalid record values (negative or non-finite
//!    durations) or invalid configuration. These are rejected at the call
//!    boundary before any shared state is touched.
//! 2. **Construction failure**: a factory invoked by the expiring cache failed.
//!    The error is handed back to the caller and nothing is installed.
//!
//! Capacity eviction is policy, not failure, and never surfaces here. Nothing
//! in the crate retries internally.
//!
//! ```
//! use dynmon::error::{ErrorClassification, ErrorSeverity, MonitorError};
//!
//! let err = MonitorError::odd_tag_pairs("requests", 3);
//! assert!(!err.is_retryable());
//! assert_eq!(err.severity(), ErrorSeverity::Warning);
//! ```

use std::fmt;

use thiserror::Error;

/// Standard result type using [`MonitorError`]
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised by monitors, the expiring cache and the dynamic registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// Monitor name was empty or whitespace only
    #[error("Invalid monitor name '{name}': name must not be empty")]
    InvalidName { name: String },

    /// Flattened `key, value, ...` tag list had an odd number of elements
    #[error("Odd number of tag strings ({len}) for monitor '{name}': expected key/value pairs")]
    OddTagPairs { name: String, len: usize },

    /// Recorded duration was negative, NaN or infinite
    #[error("Invalid duration {amount}: must be finite and non-negative")]
    InvalidDuration { amount: String },

    /// A configuration value was out of range
    #[error("Configuration error in field '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// A cache factory failed to build a value for the given key
    #[error("Failed to construct monitor for '{key}': {message}")]
    Construction { key: String, message: String },
}

impl MonitorError {
    /// Create an invalid name error
    pub fn invalid_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create an odd tag pair error
    pub fn odd_tag_pairs<S: Into<String>>(name: S, len: usize) -> Self {
        Self::OddTagPairs { name: name.into(), len }
    }

    /// Create an invalid duration error
    pub fn invalid_duration(amount: f64) -> Self {
        Self::InvalidDuration { amount: amount.to_string() }
    }

    /// Create a configuration error for a specific field
    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig { field: field.into(), message: message.into() }
    }

    /// Create a construction error for the given key
    pub fn construction<K: fmt::Display, M: Into<String>>(key: &K, message: M) -> Self {
        Self::Construction { key: key.to_string(), message: message.into() }
    }

    /// Whether the error was caused by caller-supplied input
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Construction { .. })
    }
}

impl From<toml::de::Error> for MonitorError {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid_config("toml", err.to_string())
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Classification of errors by their operational characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

impl ErrorClassification for MonitorError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidName { .. } | Self::OddTagPairs { .. } | Self::InvalidDuration { .. } => {
                ErrorSeverity::Warning
            }
            Self::InvalidConfig { .. } | Self::Construction { .. } => ErrorSeverity::Error,
        }
    }
}
