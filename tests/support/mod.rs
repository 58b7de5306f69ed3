//! Shared mock infrastructure for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pocket_sync::{
    DurableStore, Params, Result, Row, StoreConfig, StoreError, StoreOpener, Todo,
};
use tokio::sync::oneshot;

/// Scripted failure kinds, kept as a copyable enum because `StoreError`
/// itself is not `Clone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Io,
    Corruption,
}

fn make_err(f: Failure) -> StoreError {
    match f {
        Failure::Io => StoreError::Io {
            message: "simulated I/O failure".to_string(),
        },
        Failure::Corruption => StoreError::Corrupted {
            message: "simulated wal_index corruption".to_string(),
        },
    }
}

/// In-memory scripted `DurableStore`.
///
/// `execute` understands just enough SQL for the write path and the view
/// query; `sync` and `delete` consume per-call scripts.
#[derive(Debug)]
pub struct MockStore {
    rows: Mutex<Vec<Todo>>,
    next_id: Mutex<i64>,
    /// Fails every `execute`.
    pub execute_failure: Mutex<Option<Failure>>,
    /// Fails only INSERT/UPDATE statements.
    pub write_failure: Mutex<Option<Failure>>,
    sync_script: Mutex<VecDeque<std::result::Result<(), Failure>>>,
    pub delete_failure: Mutex<Option<Failure>>,
    pub sync_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    /// When set, the next `sync` call parks until the sender fires.
    sync_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Self::with_next_id(0)
    }

    /// `next_id` is the last identity already assigned; the first insert
    /// gets `next_id + 1`.
    pub fn with_next_id(next_id: i64) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            next_id: Mutex::new(next_id),
            execute_failure: Mutex::new(None),
            write_failure: Mutex::new(None),
            sync_script: Mutex::new(VecDeque::new()),
            delete_failure: Mutex::new(None),
            sync_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            sync_gate: Mutex::new(None),
        })
    }

    pub fn seed(&self, todo: Todo) {
        let mut next = self.next_id.lock();
        *next = (*next).max(todo.id);
        self.rows.lock().push(todo);
    }

    pub fn rows(&self) -> Vec<Todo> {
        self.rows.lock().clone()
    }

    pub fn script_sync(&self, result: std::result::Result<(), Failure>) {
        self.sync_script.lock().push_back(result);
    }

    /// Park the next `sync` call until the returned sender fires.
    pub fn gate_next_sync(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.sync_gate.lock() = Some(rx);
        tx
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for MockStore {
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        if let Some(f) = *self.execute_failure.lock() {
            return Err(make_err(f));
        }
        let statement = sql.trim_start().to_ascii_uppercase();

        if statement.starts_with("INSERT") {
            if let Some(f) = *self.write_failure.lock() {
                return Err(make_err(f));
            }
            let text = params
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let mut next = self.next_id.lock();
            *next += 1;
            self.rows.lock().push(Todo {
                id: *next,
                text,
                completed: 0,
            });
            return Ok(Vec::new());
        }

        if statement.starts_with("UPDATE") {
            if let Some(f) = *self.write_failure.lock() {
                return Err(make_err(f));
            }
            let completed = params.first().and_then(|v| v.as_i64()).unwrap_or(0);
            let id = params.get(1).and_then(|v| v.as_i64()).unwrap_or(0);
            for row in self.rows.lock().iter_mut() {
                if row.id == id {
                    row.completed = completed;
                }
            }
            return Ok(Vec::new());
        }

        if statement.starts_with("SELECT") {
            let mut rows = self.rows.lock().clone();
            rows.sort_by(|a, b| b.id.cmp(&a.id));
            return Ok(rows.iter().map(Todo::to_row).collect());
        }

        // PRAGMA / CREATE TABLE — accepted, no rows.
        Ok(Vec::new())
    }

    async fn sync(&self) -> Result<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.sync_gate.lock().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        match self.sync_script.lock().pop_front() {
            Some(Ok(())) | None => Ok(()),
            Some(Err(f)) => Err(make_err(f)),
        }
    }

    async fn delete(&self) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(f) = *self.delete_failure.lock() {
            return Err(make_err(f));
        }
        self.rows.lock().clear();
        Ok(())
    }
}

/// Hands out pre-built stores in order; errors when the script runs dry.
pub struct ScriptedOpener {
    stores: Mutex<VecDeque<Arc<MockStore>>>,
}

impl ScriptedOpener {
    pub fn new(stores: impl IntoIterator<Item = Arc<MockStore>>) -> Arc<Self> {
        Arc::new(Self {
            stores: Mutex::new(stores.into_iter().collect()),
        })
    }
}

impl StoreOpener for ScriptedOpener {
    fn open(&self, _config: &StoreConfig) -> Result<Arc<dyn DurableStore>> {
        self.stores
            .lock()
            .pop_front()
            .map(|s| s as Arc<dyn DurableStore>)
            .ok_or_else(|| StoreError::Io {
                message: "scripted opener exhausted".to_string(),
            })
    }
}

/// Drive spawned tasks to quiescence under a paused-clock runtime.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
