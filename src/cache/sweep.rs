//! Fixed-interval background maintenance task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Handle to a running sweep task.
///
/// The task is aborted when the handle is stopped or dropped, so owners
/// never leak timers past their own lifetime.
#[derive(Debug)]
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Run `sweep` every `period` until it returns `None` or the handle goes
    /// away. `sweep` reports how many entries it removed.
    pub(crate) fn spawn<F>(period: Duration, mut sweep: F) -> Self
    where
        F: FnMut() -> Option<usize> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // A late sweep is harmless; skip the catch-up burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match sweep() {
                    Some(0) => {}
                    Some(removed) => debug!(removed, "swept expired cache entries"),
                    None => break,
                }
            }
        });
        Self { task }
    }

    /// Stop the sweep task.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Whether the task has ended (stopped, or its cache was dropped).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
