//! Scoped timing for [`BasicTimer`]

use std::time::{Duration, Instant};

use super::timer::BasicTimer;
use crate::clock::Clock;

/// Measures elapsed time and records it into a timer exactly once
///
/// The observation is recorded by [`stop`](Self::stop), or on drop if the
/// stopwatch was never stopped.
///
/// ```
/// use dynmon::monitor::BasicTimer;
/// use dynmon::tag::MonitorConfig;
///
/// let timer = BasicTimer::new(MonitorConfig::new("work")?);
/// {
///     let _watch = timer.start();
///     // ... timed work ...
/// }
/// assert_eq!(timer.count(), 1);
/// # Ok::<(), dynmon::MonitorError>(())
/// ```
#[derive(Debug)]
#[must_use = "a stopwatch records when stopped or dropped"]
pub struct Stopwatch<'a, C: Clock> {
    timer: &'a BasicTimer,
    clock: C,
    started: Option<Instant>,
}

impl<'a, C: Clock> Stopwatch<'a, C> {
    pub(crate) fn new(timer: &'a BasicTimer, clock: C) -> Self {
        let started = Some(clock.now());
        Self { timer, clock, started }
    }

    /// Time elapsed so far, without recording
    pub fn elapsed(&self) -> Duration {
        self.started.map_or(Duration::ZERO, |started| self.clock.now().duration_since(started))
    }

    /// Stop and record, returning the measured duration
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        match self.started.take() {
            Some(started) => {
                let elapsed = self.clock.now().duration_since(started);
                self.timer.record_duration(elapsed);
                elapsed
            }
            None => Duration::ZERO,
        }
    }
}

impl<C: Clock> Drop for Stopwatch<'_, C> {
    fn drop(&mut self) {
        self.finish();
    }
}
