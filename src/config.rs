//! Store configuration — replication endpoint and credentials.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Environment variable naming the remote replication endpoint URL.
pub const ENV_SYNC_URL: &str = "POCKET_SYNC_URL";

/// Environment variable naming the replication authentication token.
pub const ENV_AUTH_TOKEN: &str = "POCKET_SYNC_AUTH_TOKEN";

/// Default on-disk database file name.
pub const DEFAULT_DB_NAME: &str = "pocket_sync.db";

/// Configuration consumed when opening the durable store.
///
/// A replicated store requires both `sync_url` and `auth_token`; a local-only
/// store (no remote authority) leaves both unset.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub sync_url: Option<String>,
    pub auth_token: Option<String>,
}

impl StoreConfig {
    /// A local-only store at `db_path`, with no remote authority.
    pub fn local(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            sync_url: None,
            auth_token: None,
        }
    }

    /// A replicated store at `db_path`.
    pub fn replicated(
        db_path: impl Into<PathBuf>,
        sync_url: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            sync_url: Some(sync_url.into()),
            auth_token: Some(auth_token.into()),
        }
    }

    /// Build a replicated configuration from the environment.
    ///
    /// Fails if either [`ENV_SYNC_URL`] or [`ENV_AUTH_TOKEN`] is absent or
    /// empty — an unreplicated open must be an explicit choice
    /// ([`StoreConfig::local`]), never a silent fallback.
    pub fn from_env(db_path: impl Into<PathBuf>) -> Result<Self> {
        let sync_url = require_env(ENV_SYNC_URL)?;
        let auth_token = require_env(ENV_AUTH_TOKEN)?;
        Ok(Self::replicated(db_path, sync_url, auth_token))
    }

    /// Whether this configuration names a remote authority.
    pub fn is_replicated(&self) -> bool {
        self.sync_url.is_some()
    }

    /// Validate that credentials come in a complete pair.
    pub fn validate(&self) -> Result<()> {
        match (&self.sync_url, &self.auth_token) {
            (Some(_), None) => Err(StoreError::Config(format!(
                "sync URL set but auth token missing ({ENV_AUTH_TOKEN})"
            ))),
            (None, Some(_)) => Err(StoreError::Config(format!(
                "auth token set but sync URL missing ({ENV_SYNC_URL})"
            ))),
            _ => Ok(()),
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StoreError::Config(format!("{name} is not set"))),
    }
}
