//! Optimistic overlay — staging area for not-yet-durable mutations.
//!
//! Two kinds of stage: pending inserts keyed by a temporary identifier, and
//! pending field overrides keyed by durable identifier. [`merged_view`] lays
//! the overlay over a durable snapshot to produce what the consumer sees.
//!
//! Staged entries are retired by acknowledgement (a view reports that it has
//! refetched after the write landed, see [`crate::reactive::WriteToken`]) or
//! rolled back immediately when the durable write fails. A record may
//! transiently exist in both the overlay and the durable snapshot between
//! the write landing and the acknowledgement; that window is bounded by one
//! view refetch.
//!
//! [`merged_view`]: OptimisticOverlay::merged_view

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::reactive::WriteToken;
use crate::types::{RecordId, TempId, Todo};

pub mod writer;

pub use writer::{TodoWriter, WriteFailure, WriteOp};

/// A staged insert awaiting durable confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInsert {
    pub temp_id: TempId,
    pub text: String,
    pub completed: i64,
}

/// A staged field override for an existing record. Holds only the overridden
/// field. A newer override for the same record replaces this one outright.
#[derive(Debug, Clone, Copy)]
struct PendingOverride {
    completed: i64,
    generation: u64,
}

/// Per-mutation-kind staging area merged over durable query results.
pub struct OptimisticOverlay {
    /// Staging order, most recently staged first.
    inserts: Mutex<Vec<PendingInsert>>,
    overrides: Mutex<HashMap<RecordId, PendingOverride>>,
    /// Last issued temp id — advanced monotonically past the wall clock so
    /// ids are unique for the process lifetime and numerically disjoint in
    /// practice from store-assigned identities.
    last_temp_id: Mutex<TempId>,
    next_generation: AtomicU64,
}

impl OptimisticOverlay {
    pub fn new() -> Self {
        Self {
            inserts: Mutex::new(Vec::new()),
            overrides: Mutex::new(HashMap::new()),
            last_temp_id: Mutex::new(0),
            next_generation: AtomicU64::new(1),
        }
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Stage a pending insert and return its temporary identifier.
    /// Synchronous — never touches durable I/O.
    pub fn begin_insert(&self, text: impl Into<String>) -> TempId {
        let temp_id = self.alloc_temp_id();
        self.inserts.lock().insert(
            0,
            PendingInsert {
                temp_id,
                text: text.into(),
                completed: 0,
            },
        );
        temp_id
    }

    /// Stage a completion-flag override for `id`, superseding any previous
    /// override for the same record. Returns the override's generation.
    pub fn begin_update(&self, id: RecordId, completed: i64) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.overrides.lock().insert(
            id,
            PendingOverride {
                completed,
                generation,
            },
        );
        generation
    }

    // -----------------------------------------------------------------------
    // Retirement
    // -----------------------------------------------------------------------

    /// Retire a confirmed-and-observed pending insert. Idempotent.
    pub fn commit_insert(&self, temp_id: TempId) {
        self.inserts.lock().retain(|p| p.temp_id != temp_id);
    }

    /// Retire a confirmed-and-observed override, unless a newer override has
    /// superseded it (stale generation: no-op). Idempotent.
    pub fn commit_update(&self, id: RecordId, generation: u64) {
        let mut overrides = self.overrides.lock();
        if overrides.get(&id).is_some_and(|o| o.generation == generation) {
            overrides.remove(&id);
        }
    }

    /// Remove a failed pending insert immediately, returning the original
    /// payload so the caller can restore its input.
    pub fn rollback_insert(&self, temp_id: TempId) -> Option<String> {
        let mut inserts = self.inserts.lock();
        let pos = inserts.iter().position(|p| p.temp_id == temp_id)?;
        Some(inserts.remove(pos).text)
    }

    /// Remove a failed override immediately. Stale generation: no-op.
    pub fn rollback_update(&self, id: RecordId, generation: u64) {
        self.commit_update(id, generation);
    }

    /// View-side retirement entry point: a view observed the write named by
    /// `token` in a fresh durable snapshot.
    pub fn acknowledge(&self, token: WriteToken) {
        match token {
            WriteToken::Insert(temp_id) => self.commit_insert(temp_id),
            WriteToken::Update(id, generation) => self.commit_update(id, generation),
        }
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    /// Lay the overlay over a durable snapshot:
    ///
    /// 1. pending inserts first, most recently staged first;
    /// 2. durable rows in their native order, with any matching override
    ///    substituting the completion flag (no other field is altered).
    pub fn merged_view(&self, durable: &[Todo]) -> Vec<Todo> {
        let inserts = self.inserts.lock();
        let overrides = self.overrides.lock();

        let mut out: Vec<Todo> = Vec::with_capacity(inserts.len() + durable.len());
        for pending in inserts.iter() {
            out.push(Todo {
                id: pending.temp_id,
                text: pending.text.clone(),
                completed: pending.completed,
            });
        }
        for row in durable {
            let mut row = row.clone();
            if let Some(o) = overrides.get(&row.id) {
                row.completed = o.completed;
            }
            out.push(row);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn pending_insert_count(&self) -> usize {
        self.inserts.lock().len()
    }

    pub fn has_override(&self, id: RecordId) -> bool {
        self.overrides.lock().contains_key(&id)
    }

    fn alloc_temp_id(&self) -> TempId {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let mut last = self.last_temp_id.lock();
        *last = now_ms.max(*last + 1);
        *last
    }
}

impl Default for OptimisticOverlay {
    fn default() -> Self {
        Self::new()
    }
}
