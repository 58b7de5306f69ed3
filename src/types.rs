//! Core data types shared across the crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Name of the single relation persisted by this core.
pub const TODOS_TABLE: &str = "todos";

/// Durable record identity, assigned by the store on insert.
pub type RecordId = i64;

/// Locally generated identifier for a not-yet-durable insert. Drawn from a
/// monotonic wall-clock source, so in practice numerically disjoint from the
/// store's auto-increment identities.
pub type TempId = i64;

/// A result row: column name to value, in the store's native JSON mapping.
pub type Row = Map<String, Value>;

/// Positional query parameters.
pub type Params = Vec<Value>;

/// The single relation persisted by this core.
///
/// `completed` is a boolean-as-integer flag (0/1), matching the stored
/// column. Records are never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: RecordId,
    pub text: String,
    #[serde(default)]
    pub completed: i64,
}

impl Todo {
    /// Decode a store row into a `Todo`.
    pub fn from_row(row: &Row) -> Result<Self> {
        serde_json::from_value(Value::Object(row.clone())).map_err(|e| StoreError::Decode {
            message: e.to_string(),
        })
    }

    /// Encode as a store row (used by test doubles and fixtures).
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct with named fields always serializes to an object.
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_row_decodes_all_fields() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(17));
        row.insert("text".to_string(), json!("buy milk"));
        row.insert("completed".to_string(), json!(1));

        let todo = Todo::from_row(&row).unwrap();
        assert_eq!(todo.id, 17);
        assert_eq!(todo.text, "buy milk");
        assert_eq!(todo.completed, 1);
    }

    #[test]
    fn from_row_defaults_missing_completed() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(3));
        row.insert("text".to_string(), json!("x"));

        let todo = Todo::from_row(&row).unwrap();
        assert_eq!(todo.completed, 0);
    }

    #[test]
    fn from_row_rejects_malformed() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!("not a number"));
        row.insert("text".to_string(), json!("x"));

        let err = Todo::from_row(&row).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn row_round_trip() {
        let todo = Todo {
            id: 5,
            text: "call mom".to_string(),
            completed: 0,
        };
        assert_eq!(Todo::from_row(&todo.to_row()).unwrap(), todo);
    }
}
