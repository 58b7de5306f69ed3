//! The durable store collaborator.
//!
//! The storage engine and its replication wire protocol live behind
//! [`DurableStore`]: `execute` for reads and writes, `sync` for one
//! replication pass against the remote authority, `delete` for destructive
//! removal of the on-disk state. The crate owns a single handle at a time
//! (see [`crate::context::DbContext`]); everything above this trait treats
//! the store as the sole source of durable truth.
//!
//! Corruption is classified here, at the boundary: implementations return
//! [`StoreError::Corrupted`] directly, and [`classify_message`] exists for
//! backends that only surface message strings.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::types::{Params, Row};

pub mod sqlite;

pub use sqlite::{SqliteOpener, SqliteStore};

/// The failure text emitted when the local replication index is unusable.
/// Only [`classify_message`] may match on it.
pub const WAL_INDEX_SIGNATURE: &str = "wal_index";

/// Classify a bare backend failure message into a structured [`StoreError`].
pub fn classify_message(message: impl Into<String>) -> StoreError {
    let message = message.into();
    if message.contains(WAL_INDEX_SIGNATURE) {
        StoreError::Corrupted { message }
    } else {
        StoreError::Io { message }
    }
}

/// Opaque durable store: the authoritative, persisted, eventually-replicated
/// data store.
///
/// All methods may suspend on I/O. Implementations must be safe to share via
/// `Arc` across the foreground write path and the background sync path — one
/// logical connection observed by both.
#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    /// Execute `sql` with positional `params`, returning result rows (empty
    /// for statements that produce none).
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// Run one replication pass (push local writes, pull remote changes).
    async fn sync(&self) -> Result<()>;

    /// Remove the store's on-disk representation.
    async fn delete(&self) -> Result<()>;
}

/// Factory seam for opening store handles from configuration.
///
/// The sync/recovery controller uses this both for normal opens and for
/// obtaining a throwaway handle whose only purpose is `delete()` during a
/// destructive reset.
pub trait StoreOpener: Send + Sync {
    fn open(&self, config: &StoreConfig) -> Result<Arc<dyn DurableStore>>;
}
