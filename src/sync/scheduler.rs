//! SyncScheduler — periodic replication ticker.
//!
//! Invokes `synchronize()` on a fixed interval for the lifetime of the
//! process. The ticker runs on its own task and never blocks the write
//! path; a tick that finds the controller busy or corrupted is simply a
//! no-op (`SyncOutcome::Skipped`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::controller::SyncController;

/// Default replication interval, order of seconds.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

pub struct SyncScheduler {
    disposed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Start ticking `controller.synchronize()` every `interval`.
    ///
    /// The first pass runs one full interval after spawn, not immediately —
    /// initialization already leaves the store fresh.
    pub fn spawn(controller: Arc<SyncController>, interval: Duration) -> Self {
        let disposed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&disposed);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval's first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                let outcome = controller.synchronize().await;
                tracing::trace!(?outcome, "scheduled sync tick");
            }
        });
        Self { disposed, task }
    }

    /// Stop the ticker. Idempotent.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}
