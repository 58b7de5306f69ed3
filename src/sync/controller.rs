//! SyncController — the sync/recovery state machine.
//!
//! Legal state transitions:
//!
//! ```text
//! Uninitialized -> Ready          (initialize succeeds)
//! Ready <-> Syncing               (around each replication pass)
//! Ready|Syncing -> Corrupted      (corruption-classified failure)
//! Corrupted -> Uninitialized      (destructive reset's deletion succeeds)
//! ```
//!
//! All other components treat the state as read-only. Writes are illegal
//! while `Corrupted`: the destructive reset clears the context's store
//! handle, so the write path fails fast with `Unavailable` until the next
//! `initialize()`.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::context::DbContext;
use crate::error::Result;
use crate::reactive::ChangeNotice;
use crate::store::{DurableStore, StoreOpener};

/// Idempotent store preparation, safe against an already-initialized store.
const INIT_STATEMENTS: &[&str] = &[
    "PRAGMA journal_mode = WAL;",
    "CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        completed INTEGER DEFAULT 0
    );",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Ready,
    Syncing,
    Corrupted,
}

/// What a `synchronize()` call did. Informational — the call itself never
/// escalates a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// State was not `Ready`; nothing was attempted.
    Skipped,
    /// Replication pass succeeded; a change notice was published.
    Completed,
    /// Replication failed transiently; retried on the next scheduled tick.
    TransientFailure,
    /// Replication failure was classified as corruption; the store was
    /// destructively reset and must be re-initialized.
    CorruptionReset,
}

pub struct SyncController {
    ctx: Arc<DbContext>,
    opener: Arc<dyn StoreOpener>,
    state: Mutex<SyncState>,
}

impl SyncController {
    pub fn new(ctx: Arc<DbContext>, opener: Arc<dyn StoreOpener>) -> Self {
        Self {
            ctx,
            opener,
            state: Mutex::new(SyncState::Uninitialized),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Open the durable store, apply pragmas and schema, and install the
    /// handle in the context. Transitions to `Ready`.
    ///
    /// A corruption-classified open failure triggers a destructive reset and
    /// exactly one retry; any other failure propagates untouched.
    pub async fn initialize(&self) -> Result<()> {
        tracing::info!("initializing durable store");
        match self.open_and_prepare().await {
            Ok(store) => {
                self.ctx.install_store(store);
                self.set_state(SyncState::Ready);
                Ok(())
            }
            Err(e) if e.is_corruption() => {
                tracing::warn!(error = %e, "corrupted store detected during open; resetting");
                self.destructive_reset().await;
                let store = self.open_and_prepare().await?;
                self.ctx.install_store(store);
                self.set_state(SyncState::Ready);
                tracing::info!("store recovered after destructive reset");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run one replication pass. No-op unless `Ready`.
    ///
    /// Success publishes a broadcast change notice so every view refetches.
    /// Transient failure is logged and left for the next scheduled tick.
    /// Corruption transitions to `Corrupted` and performs the destructive
    /// reset; reopening is left to the next `initialize()` call.
    pub async fn synchronize(&self) -> SyncOutcome {
        {
            let mut state = self.state.lock();
            if *state != SyncState::Ready {
                return SyncOutcome::Skipped;
            }
            *state = SyncState::Syncing;
        }

        let store = match self.ctx.store() {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "sync skipped: store handle missing");
                self.set_state(SyncState::Ready);
                return SyncOutcome::TransientFailure;
            }
        };

        let started = Instant::now();
        match store.sync().await {
            Ok(()) => {
                tracing::debug!(elapsed = ?started.elapsed(), "sync finished");
                self.ctx.bus().publish(&ChangeNotice::broadcast());
                self.set_state(SyncState::Ready);
                SyncOutcome::Completed
            }
            Err(e) if e.is_corruption() => {
                tracing::error!(error = %e, "replication failure indicates corruption; resetting store");
                self.set_state(SyncState::Corrupted);
                self.destructive_reset().await;
                SyncOutcome::CorruptionReset
            }
            Err(e) => {
                tracing::warn!(error = %e, "sync failed; will retry on next tick");
                self.set_state(SyncState::Ready);
                SyncOutcome::TransientFailure
            }
        }
    }

    /// Best-effort deletion of the store's on-disk representation. Errors
    /// are logged, never propagated — the caller's purpose is recovery.
    ///
    /// Callable from any state: the corruption path arrives here from
    /// `Corrupted`, but a manual reset from `Ready` is also supported and
    /// takes the same `-> Uninitialized` transition.
    ///
    /// Clears the context's handle first so new operations fail fast; an
    /// in-flight operation against the old handle completes or fails on its
    /// own (best-effort ordering). Transitions to `Uninitialized` only when
    /// the deletion succeeds.
    pub async fn destructive_reset(&self) {
        tracing::warn!("destructively resetting durable store");
        let store: Arc<dyn DurableStore> = match self.ctx.clear_store() {
            Some(store) => store,
            // No live handle (open itself failed) — borrow one solely to
            // delete the on-disk state.
            None => match self.opener.open(self.ctx.config()) {
                Ok(store) => store,
                Err(e) => {
                    tracing::error!(error = %e, "could not obtain a handle for reset");
                    return;
                }
            },
        };
        match store.delete().await {
            Ok(()) => {
                tracing::info!("on-disk store removed");
                self.set_state(SyncState::Uninitialized);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to remove on-disk store");
            }
        }
    }

    async fn open_and_prepare(&self) -> Result<Arc<dyn DurableStore>> {
        let store = self.opener.open(self.ctx.config())?;
        for sql in INIT_STATEMENTS {
            store.execute(sql, &Vec::new()).await?;
        }
        Ok(store)
    }

    fn set_state(&self, next: SyncState) {
        *self.state.lock() = next;
    }
}
