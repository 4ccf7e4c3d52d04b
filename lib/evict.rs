//! Periodic staleness eviction.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::store::DirCache;
use crate::sync::Weak;

/// Guard for a running sweeper task. Dropping it stops the task.
///
/// The task calls [`DirCache::evict_stale`] once per period. It never keeps the cache alive, and
/// exits on its own at the first tick after the cache is dropped.
#[derive(Debug)]
pub struct Sweeper {
    task: JoinHandle<()>,
}

impl Sweeper {
    pub(crate) fn spawn(runtime: &Handle, cache: Weak<DirCache>, period: Duration) -> Self {
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing can be stale yet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("cache dropped, stopping sweeper");
                    break;
                };
                let evicted = cache.evict_stale();
                if evicted > 0 {
                    debug!(evicted, "sweeper evicted stale snapshots");
                }
            }
        });
        Self { task }
    }

    /// Whether the task has exited (because the cache was dropped).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the sweeper. Equivalent to dropping the guard.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}
