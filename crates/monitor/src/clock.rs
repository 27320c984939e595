//! Monotonic time source for expiry and stopwatches
//!
//! Idle expiry and [`Stopwatch`](crate::monitor::Stopwatch) measurements read
//! the time through [`Clock`]. Production code uses [`SystemClock`]; tests
//! drive a [`MockClock`] by hand so expiry scenarios need no sleeping.
//!
//! ```
//! use std::time::Duration;
//!
//! use dynmon::clock::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let created = clock.now();
//! clock.advance_millis(1500);
//! assert_eq!(clock.now() - created, Duration::from_millis(1500));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic instants
pub trait Clock: Send + Sync + 'static {
    /// The current instant; never goes backwards
    fn now(&self) -> Instant;
}

/// `Instant::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        T::now(self)
    }
}

/// Hand-driven clock
///
/// Time only moves through [`advance`](Self::advance). Clones share one
/// offset, so the copy given to a cache or registry follows the test's copy.
#[derive(Debug, Clone)]
pub struct MockClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Start at the real current instant with a zero offset
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset: Arc::default() }
    }

    /// Move time forward
    pub fn advance(&self, step: Duration) {
        let mut offset = self.offset.lock();
        *offset = offset.saturating_add(step);
    }

    /// Move time forward by `millis` milliseconds
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Total time advanced since creation
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
