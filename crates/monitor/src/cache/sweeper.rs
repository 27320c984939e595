//! Optional background sweeper for [`ExpiringCache`]
//!
//! Amortized sweeps only run when the cache is being used. A cache that goes
//! quiet keeps its idle entries until the next call; the sweeper removes them
//! on a fixed period instead.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ExpiringCache;
use crate::clock::Clock;

const MIN_PERIOD: Duration = Duration::from_millis(1);

impl<K, V, C> ExpiringCache<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Spawn a task on the current Tokio runtime that sweeps every `period`
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    /// Returns `None` when called outside a runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> Option<JoinHandle<()>> {
        spawn_periodic(self, period, "expiring cache", |cache| {
            cache.sweep();
        })
    }
}

/// Run `sweep` against `target` every `period` until `target` is dropped
pub(crate) fn spawn_periodic<T, F>(
    target: &Arc<T>,
    period: Duration,
    label: &'static str,
    sweep: F,
) -> Option<JoinHandle<()>>
where
    T: Send + Sync + 'static,
    F: Fn(&T) + Send + 'static,
{
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!(target_kind = label, "Skipping sweeper: no active Tokio runtime detected");
            return None;
        }
    };

    let target = Arc::downgrade(target);
    let period = period.max(MIN_PERIOD);
    Some(runtime.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(target) = target.upgrade() else {
                break;
            };
            sweep(target.as_ref());
        }
        debug!(target_kind = label, "sweep target dropped, sweeper exiting");
    }))
}
