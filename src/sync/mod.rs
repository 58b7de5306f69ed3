pub mod controller;
pub mod scheduler;

pub use controller::{SyncController, SyncOutcome, SyncState};
pub use scheduler::{SyncScheduler, DEFAULT_SYNC_INTERVAL};
