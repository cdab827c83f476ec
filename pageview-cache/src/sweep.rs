//! Background sweep of expired entries.

use std::hash::Hash;
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::cache::TtlCache;

/// Handle to a running sweep task.
///
/// Dropping the handle leaves the task running; it ends on [`SweepHandle::stop`]
/// or once the cache itself is dropped.
#[derive(Debug)]
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stops the sweep task.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Spawns a task that purges expired entries every `sweep_interval`.
    ///
    /// Must be called from within a tokio runtime. The task only holds a weak
    /// reference, so it never keeps the cache alive.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweepHandle {
        let period = self.config().sweep_interval;
        let cache: Weak<Self> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("cache dropped, sweep task exiting");
                    return;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "swept expired cache entries");
                }
            }
        });

        SweepHandle { task }
    }
}
