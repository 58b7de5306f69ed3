//! DbContext — explicitly constructed ownership of the change bus and the
//! single durable-store handle.
//!
//! There are no process-wide singletons: every component receives an
//! `Arc<DbContext>` at construction. The handle slot holds at most one store
//! at a time; the sync/recovery controller installs it on `initialize()` and
//! clears it during a destructive reset, so post-reset operations fail fast
//! with [`StoreError::Unavailable`] instead of touching deleted state.
//! In-flight operations holding the old `Arc` run to completion or failure
//! against it (best-effort ordering; the store remains the source of truth).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::reactive::ChangeBus;
use crate::store::DurableStore;

pub struct DbContext {
    bus: ChangeBus,
    handle: RwLock<Option<Arc<dyn DurableStore>>>,
    config: StoreConfig,
}

impl DbContext {
    pub fn new(config: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            bus: ChangeBus::new(),
            handle: RwLock::new(None),
            config,
        })
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current store handle, or [`StoreError::Unavailable`] when none is
    /// installed (before `initialize()`, or after a destructive reset).
    pub fn store(&self) -> Result<Arc<dyn DurableStore>> {
        self.handle.read().clone().ok_or(StoreError::Unavailable)
    }

    /// Install the (sole) store handle, replacing any previous one.
    pub fn install_store(&self, store: Arc<dyn DurableStore>) {
        *self.handle.write() = Some(store);
    }

    /// Remove the store handle, returning it for a final operation (the
    /// reset path deletes through it).
    pub fn clear_store(&self) -> Option<Arc<dyn DurableStore>> {
        self.handle.write().take()
    }

    /// Defined teardown: drop every bus listener and the store handle.
    pub fn teardown(&self) {
        self.bus.clear();
        *self.handle.write() = None;
    }
}
