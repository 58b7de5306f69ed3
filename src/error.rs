use thiserror::Error;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors surfaced by the durable store and the components built on top of it.
///
/// Corruption is a structured variant, not a message pattern: implementations
/// of [`crate::store::DurableStore`] classify backend failures at the boundary
/// (see [`crate::store::classify_message`]) so that consumers can branch on
/// [`StoreError::is_corruption`] instead of inspecting error text.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's local replication index is unusable and must be rebuilt
    /// from scratch via a destructive reset.
    #[error("durable store is corrupted: {message}")]
    Corrupted { message: String },

    /// No durable store handle is installed in the context. Writes and reads
    /// fail fast with this error after a destructive reset until
    /// `initialize()` succeeds again.
    #[error("no durable store handle available; call initialize() first")]
    Unavailable,

    #[error("missing or invalid configuration: {0}")]
    Config(String),

    #[error("failed to decode row: {message}")]
    Decode { message: String },

    /// Transient backend I/O failure (network, disk, lock contention).
    #[error("store I/O error: {message}")]
    Io { message: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Whether this failure indicates unrecoverable local state that requires
    /// a destructive reset, as opposed to a transient failure worth retrying.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    pub(crate) fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

/// Convenience alias — the default error type is `StoreError`.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupted_is_corruption() {
        let e = StoreError::Corrupted {
            message: "wal_index mismatch".to_string(),
        };
        assert!(e.is_corruption());
    }

    #[test]
    fn io_is_not_corruption() {
        assert!(!StoreError::io("connection refused").is_corruption());
        assert!(!StoreError::Unavailable.is_corruption());
    }

    #[test]
    fn unavailable_display_mentions_initialize() {
        let msg = StoreError::Unavailable.to_string();
        assert!(msg.contains("initialize()"), "missing 'initialize()': {msg}");
    }

    #[test]
    fn config_display_carries_detail() {
        let msg = StoreError::Config("POCKET_SYNC_URL not set".to_string()).to_string();
        assert!(msg.contains("POCKET_SYNC_URL"), "detail missing: {msg}");
    }
}
