//! ChangeBus — process-wide change notifications.
//!
//! Listeners are stored as `Arc<dyn Fn(&ChangeNotice)>` so emission snapshots
//! are cheap. Snapshot-on-publish semantics: a listener removed during a
//! publish round is still called in that round, a listener added during one
//! is not called until the next. The lock is never held while callbacks run,
//! so listeners may subscribe/unsubscribe reentrantly.
//!
//! A notice carries no data payload — subscribers re-derive state by
//! re-querying. It does carry two pieces of routing metadata:
//!
//! - the set of affected tables, used for scoped invalidation (an empty set
//!   means broadcast);
//! - zero or more [`WriteToken`]s, which a refetching view acknowledges
//!   against the optimistic overlay once it has observed the write.
//!
//! A panicking listener is isolated: the panic is caught and logged, and the
//! remaining listeners still run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{RecordId, TempId};

/// Identifies a listener registration for [`ChangeBus::unsubscribe`].
pub type SubscriptionId = u64;

/// Identifies a staged optimistic write awaiting observation by a view.
///
/// Update tokens carry the override's generation so a stale acknowledgement
/// cannot retire a newer override for the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteToken {
    Insert(TempId),
    Update(RecordId, u64),
}

/// A zero-payload change notification with routing metadata.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotice {
    /// Tables the change touched. Empty means every listener is invoked.
    pub tables: Vec<String>,
    /// Staged writes to acknowledge once a view has refetched.
    pub tokens: Vec<WriteToken>,
}

impl ChangeNotice {
    /// A notice delivered to every listener regardless of declared tables.
    pub fn broadcast() -> Self {
        Self::default()
    }

    /// A notice scoped to a single table.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            tables: vec![table.into()],
            tokens: Vec::new(),
        }
    }

    pub fn with_token(mut self, token: WriteToken) -> Self {
        self.tokens.push(token);
        self
    }
}

type ListenerFn = dyn Fn(&ChangeNotice) + Send + Sync;

struct Registration {
    id: SubscriptionId,
    /// Declared affected-table interest. Empty means "everything".
    tables: Vec<String>,
    callback: Arc<ListenerFn>,
}

impl Registration {
    fn wants(&self, notice: &ChangeNotice) -> bool {
        if notice.tables.is_empty() || self.tables.is_empty() {
            return true;
        }
        self.tables.iter().any(|t| notice.tables.contains(t))
    }
}

/// Publish/subscribe registry of change listeners.
pub struct ChangeBus {
    listeners: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` to be invoked for notices that touch any of
    /// `tables` (empty slice: every notice). Returns the registration id.
    pub fn subscribe(
        &self,
        tables: &[&str],
        callback: impl Fn(&ChangeNotice) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Registration {
            id,
            tables: tables.iter().map(|t| t.to_string()).collect(),
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove the listener identified by `id`. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|r| r.id != id);
    }

    /// Invoke every matching listener synchronously.
    ///
    /// No invocation-order guarantee is part of the contract. A listener
    /// panic is caught and logged; the rest of the round proceeds.
    pub fn publish(&self, notice: &ChangeNotice) {
        let snapshot: Vec<Arc<ListenerFn>> = {
            let guard = self.listeners.lock();
            guard
                .iter()
                .filter(|r| r.wants(notice))
                .map(|r| Arc::clone(&r.callback))
                .collect()
        };
        for cb in snapshot {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(notice)));
            if outcome.is_err() {
                tracing::error!("change listener panicked; continuing with remaining listeners");
            }
        }
    }

    /// Number of currently registered listeners.
    pub fn size(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Drop every registration (context teardown).
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&ChangeNotice) + Send + Sync) {
        let n = Arc::new(AtomicUsize::new(0));
        let n2 = Arc::clone(&n);
        (n, move |_: &ChangeNotice| {
            n2.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn publish_reaches_subscribed_listener() {
        let bus = ChangeBus::new();
        let (n, cb) = counter();
        bus.subscribe(&[], cb);
        bus.publish(&ChangeNotice::broadcast());
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = ChangeBus::new();
        let (n, cb) = counter();
        let id = bus.subscribe(&[], cb);
        bus.unsubscribe(id);
        bus.unsubscribe(id);
        bus.publish(&ChangeNotice::broadcast());
        assert_eq!(n.load(Ordering::SeqCst), 0);
        assert_eq!(bus.size(), 0);
    }

    #[test]
    fn table_scoping_skips_disjoint_listeners() {
        let bus = ChangeBus::new();
        let (hits, cb) = counter();
        let (misses, cb2) = counter();
        bus.subscribe(&["todos"], cb);
        bus.subscribe(&["settings"], cb2);

        bus.publish(&ChangeNotice::for_table("todos"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(misses.load(Ordering::SeqCst), 0);

        // Broadcast reaches everyone.
        bus.publish(&ChangeNotice::broadcast());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(misses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_starve_others() {
        let bus = ChangeBus::new();
        bus.subscribe(&[], |_| panic!("listener bug"));
        let (n, cb) = counter();
        bus.subscribe(&[], cb);

        bus.publish(&ChangeNotice::broadcast());
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_registered_during_publish_waits_for_next_round() {
        let bus = Arc::new(ChangeBus::new());
        let (n, cb) = counter();
        let bus2 = Arc::clone(&bus);
        bus.subscribe(&[], move |_| {
            bus2.subscribe(&[], |_| {});
        });
        bus.subscribe(&[], cb);

        bus.publish(&ChangeNotice::broadcast());
        assert_eq!(n.load(Ordering::SeqCst), 1);
        assert_eq!(bus.size(), 3);
    }
}
