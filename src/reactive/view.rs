//! ReactiveView — a live, auto-refreshing materialization of one query.
//!
//! The view re-executes its query on creation and on every matching change
//! notice. Refreshes run on a dedicated task that drains queued notices into
//! a single refetch (coalescing), so concurrent notifications cannot corrupt
//! the snapshot: each completed refetch replaces the snapshot wholesale
//! (last write wins; callers needing strict ordering debounce upstream).
//!
//! After a successful refetch the view acknowledges the coalesced notices'
//! write tokens against the overlay — the "I have observed this write"
//! signal that retires staged optimistic entries. A failed refetch keeps the
//! previous snapshot and acknowledges nothing.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::context::DbContext;
use crate::overlay::OptimisticOverlay;
use crate::types::{Params, Todo};

use super::bus::{ChangeNotice, SubscriptionId, WriteToken};

struct ViewInner {
    query: String,
    params: Params,
    snapshot: RwLock<Vec<Todo>>,
    ctx: Arc<DbContext>,
    overlay: Arc<OptimisticOverlay>,
}

impl ViewInner {
    /// Execute the query and replace the snapshot. Acknowledges `tokens`
    /// only when the refetch succeeds.
    async fn refresh(&self, tokens: &[WriteToken]) {
        let store = match self.ctx.store() {
            Ok(store) => store,
            Err(e) => {
                tracing::debug!(error = %e, "view refresh skipped: store unavailable");
                return;
            }
        };
        let rows = match store.execute(&self.query, &self.params).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "view refresh failed; keeping previous snapshot");
                return;
            }
        };
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match Todo::from_row(row) {
                Ok(todo) => records.push(todo),
                Err(e) => {
                    tracing::warn!(error = %e, "view refresh failed: undecodable row");
                    return;
                }
            }
        }

        *self.snapshot.write() = records;
        for token in tokens {
            self.overlay.acknowledge(*token);
        }
    }
}

/// A per-query subscription holding the last-fetched result set.
pub struct ReactiveView {
    inner: Arc<ViewInner>,
    ctx: Arc<DbContext>,
    subscription: SubscriptionId,
    task: JoinHandle<()>,
}

impl ReactiveView {
    /// Subscribe to `tables` on the context's bus and start the refresh task.
    ///
    /// `tables` is the caller-declared affected-table set: notices naming a
    /// disjoint table set are skipped; broadcast notices always refetch.
    pub fn spawn(
        ctx: Arc<DbContext>,
        overlay: Arc<OptimisticOverlay>,
        query: impl Into<String>,
        params: Params,
        tables: &[&str],
    ) -> Self {
        let inner = Arc::new(ViewInner {
            query: query.into(),
            params,
            snapshot: RwLock::new(Vec::new()),
            ctx: Arc::clone(&ctx),
            overlay,
        });

        let (tx, mut rx) = mpsc::unbounded_channel::<ChangeNotice>();
        let subscription = ctx.bus().subscribe(tables, move |notice| {
            // A closed receiver just means the view is torn down.
            let _ = tx.send(notice.clone());
        });

        let task_inner = Arc::clone(&inner);
        let task = tokio::spawn(async move {
            task_inner.refresh(&[]).await;
            while let Some(first) = rx.recv().await {
                // Coalesce everything queued while we were idle or fetching.
                let mut tokens = first.tokens;
                while let Ok(next) = rx.try_recv() {
                    tokens.extend(next.tokens);
                }
                task_inner.refresh(&tokens).await;
            }
        });

        Self {
            inner,
            ctx,
            subscription,
            task,
        }
    }

    /// The last-fetched durable result set, in the query's native order.
    pub fn snapshot(&self) -> Vec<Todo> {
        self.inner.snapshot.read().clone()
    }

    /// The durable snapshot with the optimistic overlay applied — what the
    /// consumer displays.
    pub fn merged(&self) -> Vec<Todo> {
        self.inner.overlay.merged_view(&self.inner.snapshot.read())
    }

    /// Tear down: unsubscribe from the bus and stop the refresh task.
    pub fn close(&self) {
        self.ctx.bus().unsubscribe(self.subscription);
        self.task.abort();
    }
}

impl Drop for ReactiveView {
    fn drop(&mut self) {
        self.close();
    }
}
