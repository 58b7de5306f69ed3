//! SQLite reference implementation of [`DurableStore`].
//!
//! Backed by rusqlite (bundled). `sync()` performs a WAL checkpoint — the
//! local analogue of a replication flush — so a local-only store satisfies
//! the full `DurableStore` contract. Replicating against a remote authority
//! is the job of a replica-capable opener outside this crate.
//!
//! The connection sits behind a `parking_lot::Mutex`; no lock is ever held
//! across an await point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Number, Value};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::types::{Params, Row};

use super::{DurableStore, StoreOpener};

/// Convert a JSON parameter to a SQLite value.
fn json_to_sql(v: &Value) -> rusqlite::types::Value {
    match v {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rusqlite::types::Value::Integer(i)
            } else {
                rusqlite::types::Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        // Arrays and objects travel as JSON text.
        other => rusqlite::types::Value::Text(other.to_string()),
    }
}

/// Convert a SQLite column value to JSON.
fn sql_to_json(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        // No blob columns in the schema this crate owns.
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Map a rusqlite error, classifying corruption at the boundary.
fn store_err(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(f, _) = &e {
        if matches!(
            f.code,
            rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase
        ) {
            return StoreError::Corrupted {
                message: e.to_string(),
            };
        }
    }
    StoreError::Sqlite(e)
}

/// SQLite-backed durable store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// `None` for in-memory stores — nothing on disk to delete.
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Open an in-memory store (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let bound = rusqlite::params_from_iter(params.iter().map(json_to_sql));

        // Statements that produce no columns (INSERT, UPDATE, CREATE, ...)
        // go through execute; everything else is treated as a query.
        if stmt.column_count() == 0 {
            stmt.execute(bound).map_err(store_err)?;
            return Ok(Vec::new());
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query(bound).map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(store_err)? {
            let mut map = Row::new();
            for (i, name) in columns.iter().enumerate() {
                let value = row.get_ref(i).map_err(store_err)?;
                map.insert(name.clone(), sql_to_json(value));
            }
            out.push(map);
        }
        Ok(out)
    }

    async fn sync(&self) -> Result<()> {
        let conn = self.conn.lock();
        // wal_checkpoint always yields one status row.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        remove_if_present(path)?;
        remove_if_present(&sibling(path, "-wal"))?;
        remove_if_present(&sibling(path, "-shm"))?;
        Ok(())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(format!(
            "failed to remove {}: {e}",
            path.display()
        ))),
    }
}

/// Opens [`SqliteStore`] handles from a local configuration.
pub struct SqliteOpener;

impl StoreOpener for SqliteOpener {
    fn open(&self, config: &StoreConfig) -> Result<Arc<dyn DurableStore>> {
        config.validate()?;
        if config.is_replicated() {
            return Err(StoreError::Config(
                "the sqlite reference store does not replicate; \
                 use a replica-capable opener for remote-configured stores"
                    .to_string(),
            ));
        }
        Ok(Arc::new(SqliteStore::open(&config.db_path)?))
    }
}
