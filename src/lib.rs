//! pocket-sync — a local-first data layer.
//!
//! An embedded, durable store is mutated instantly by the foreground client
//! while a background pass replicates those mutations to a remote authority
//! and pulls remote changes back down. The hard part is reconciliation under
//! asynchronous replication: optimistic writes must appear immediately,
//! survive being temporarily absent from durable query results, converge to
//! the store's truth once the write lands, and roll back cleanly on failure
//! — all while periodic synchronization can rewrite the durable store under
//! the live view, and while the store can corrupt and require destructive
//! recovery.
//!
//! # Architecture
//!
//! - [`store`] — the opaque durable-store collaborator
//!   ([`store::DurableStore`]) plus a rusqlite reference implementation.
//! - [`context`] — [`context::DbContext`], explicit ownership of the change
//!   bus and the single store handle; no process-wide singletons.
//! - [`reactive`] — [`reactive::ChangeBus`] notifications and
//!   [`reactive::ReactiveView`] live query snapshots.
//! - [`overlay`] — [`overlay::OptimisticOverlay`] staging plus
//!   [`overlay::TodoWriter`], the optimistic write path.
//! - [`sync`] — [`sync::SyncController`] state machine and
//!   [`sync::SyncScheduler`] periodic ticker.
//!
//! The overlay never resolves conflicting concurrent edits — the remote
//! authority is the sole arbiter of durable truth; the overlay only bridges
//! write latency.

pub mod config;
pub mod context;
pub mod error;
pub mod overlay;
pub mod reactive;
pub mod store;
pub mod sync;
pub mod types;

pub use config::StoreConfig;
pub use context::DbContext;
pub use error::{Result, StoreError};
pub use overlay::{OptimisticOverlay, TodoWriter, WriteFailure};
pub use reactive::{ChangeBus, ChangeNotice, ReactiveView, WriteToken};
pub use store::{DurableStore, SqliteOpener, SqliteStore, StoreOpener};
pub use sync::{SyncController, SyncOutcome, SyncScheduler, SyncState};
pub use types::{Params, RecordId, Row, TempId, Todo};
