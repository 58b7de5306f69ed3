//! TodoWriter — the optimistic write path.
//!
//! `insert` and `set_completed` stage an overlay entry synchronously and
//! spawn the durable write in the background, so the caller's view of the
//! data updates instantly. On success the writer publishes a change notice
//! carrying the write's token; the refetching view acknowledges the token,
//! retiring the stage. On failure the stage is rolled back immediately and
//! the consumer gets a single [`WriteFailure`] notification with any
//! restorable input — never a raw store error.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::context::DbContext;
use crate::error::Result;
use crate::reactive::{ChangeNotice, WriteToken};
use crate::types::{RecordId, TempId, TODOS_TABLE};

use super::OptimisticOverlay;

/// Fallback retirement delay for stages nobody acknowledges (no view is
/// subscribed). Idempotent with the acknowledgement path; tunable, not a
/// correctness guarantee.
pub const DEFAULT_COMMIT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
}

/// User-facing failure signal for a rolled-back optimistic write.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub op: WriteOp,
    /// The durable record involved, for updates.
    pub record: Option<RecordId>,
    /// The original payload, returned so the caller can re-populate its
    /// input (inserts only).
    pub restored_text: Option<String>,
    pub error: String,
}

pub type WriteFailureCallback = dyn Fn(&WriteFailure) + Send + Sync;

pub struct TodoWriter {
    ctx: Arc<DbContext>,
    overlay: Arc<OptimisticOverlay>,
    on_failure: Option<Arc<WriteFailureCallback>>,
    commit_grace: Duration,
}

impl TodoWriter {
    pub fn new(ctx: Arc<DbContext>, overlay: Arc<OptimisticOverlay>) -> Self {
        Self {
            ctx,
            overlay,
            on_failure: None,
            commit_grace: DEFAULT_COMMIT_GRACE,
        }
    }

    /// Register the failure notification callback.
    pub fn on_failure(mut self, callback: impl Fn(&WriteFailure) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    pub fn with_commit_grace(mut self, grace: Duration) -> Self {
        self.commit_grace = grace;
        self
    }

    /// Stage an insert and schedule its durable write. Returns the temporary
    /// identifier immediately — this call never blocks on store I/O.
    ///
    /// Errors only when no store handle is installed (writes are illegal
    /// while the store is corrupted or reset).
    pub fn insert(&self, text: impl Into<String>) -> Result<TempId> {
        let store = self.ctx.store()?;
        let text = text.into();
        let temp_id = self.overlay.begin_insert(text.clone());

        let ctx = Arc::clone(&self.ctx);
        let overlay = Arc::clone(&self.overlay);
        let on_failure = self.on_failure.clone();
        let grace = self.commit_grace;
        tokio::spawn(async move {
            let params = vec![Value::String(text)];
            match store
                .execute("INSERT INTO todos (text) VALUES (?)", &params)
                .await
            {
                Ok(_) => {
                    ctx.bus().publish(
                        &ChangeNotice::for_table(TODOS_TABLE)
                            .with_token(WriteToken::Insert(temp_id)),
                    );
                    tokio::time::sleep(grace).await;
                    overlay.commit_insert(temp_id);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "insert failed; rolling back optimistic stage");
                    let restored_text = overlay.rollback_insert(temp_id);
                    notify_failure(
                        on_failure.as_deref(),
                        &WriteFailure {
                            op: WriteOp::Insert,
                            record: None,
                            restored_text,
                            error: e.to_string(),
                        },
                    );
                }
            }
        });

        Ok(temp_id)
    }

    /// Stage a completion-flag override for `id` and schedule its durable
    /// write. Returns the override's generation immediately.
    pub fn set_completed(&self, id: RecordId, completed: i64) -> Result<u64> {
        let store = self.ctx.store()?;
        let generation = self.overlay.begin_update(id, completed);

        let ctx = Arc::clone(&self.ctx);
        let overlay = Arc::clone(&self.overlay);
        let on_failure = self.on_failure.clone();
        let grace = self.commit_grace;
        tokio::spawn(async move {
            let params = vec![Value::from(completed), Value::from(id)];
            match store
                .execute("UPDATE todos SET completed = ? WHERE id = ?", &params)
                .await
            {
                Ok(_) => {
                    ctx.bus().publish(
                        &ChangeNotice::for_table(TODOS_TABLE)
                            .with_token(WriteToken::Update(id, generation)),
                    );
                    tokio::time::sleep(grace).await;
                    overlay.commit_update(id, generation);
                }
                Err(e) => {
                    tracing::warn!(record = id, error = %e, "update failed; rolling back override");
                    overlay.rollback_update(id, generation);
                    notify_failure(
                        on_failure.as_deref(),
                        &WriteFailure {
                            op: WriteOp::Update,
                            record: Some(id),
                            restored_text: None,
                            error: e.to_string(),
                        },
                    );
                }
            }
        });

        Ok(generation)
    }
}

/// Callback panics are swallowed — a consumer bug must not break the
/// rollback path.
fn notify_failure(callback: Option<&WriteFailureCallback>, failure: &WriteFailure) {
    if let Some(cb) = callback {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(failure)));
    }
}
