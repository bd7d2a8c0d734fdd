//! Row and filter types shared by every storage backend

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::DomainError;

/// A stored row: a JSON object keyed by column name
pub type Row = Map<String, Value>;

/// Table names used by the workflow engine
pub mod tables {
    pub const WORKFLOWS: &str = "workflows";
    pub const STEPS: &str = "steps";
    pub const STEP_SESSIONS: &str = "step_sessions";
    pub const AGENT_WORKFLOWS: &str = "agent_workflows";
    pub const MESSAGES: &str = "messages";

    /// Every table the engine reads or writes
    pub const ALL: [&str; 5] = [WORKFLOWS, STEPS, STEP_SESSIONS, AGENT_WORKFLOWS, MESSAGES];
}

/// Row-equality filter: a row matches when every listed field equals the given value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    fields: BTreeMap<String, Value>,
}

impl RowFilter {
    /// Creates an empty filter (matches every row)
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality constraint
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Returns true if the row satisfies every constraint
    pub fn matches(&self, row: &Row) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| row.get(field) == Some(expected))
    }

    /// The filter as a JSON object (used for JSONB containment queries)
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Serializes a record into a row
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, DomainError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(DomainError::validation(format!(
            "Expected a JSON object row, got {}",
            other
        ))),
        Err(e) => Err(DomainError::validation(format!(
            "Failed to serialize row: {}",
            e
        ))),
    }
}

/// Deserializes a row into a record
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, DomainError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| DomainError::validation(format!("Failed to deserialize row: {}", e)))
}

/// Returns the `id` column of a row if it is a string
pub fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// Fills in `id` and `created_at` when the caller left them out
pub fn stamp_new_row(mut row: Row) -> Row {
    if row_id(&row).is_none() {
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }

    if !row.contains_key("created_at") || row["created_at"].is_null() {
        row.insert(
            "created_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }

    row
}

/// Applies a shallow patch to a row; the `id` column is never overwritten
pub fn apply_patch(row: &mut Row, patch: Row) {
    for (field, value) in patch {
        if field != "id" {
            row.insert(field, value);
        }
    }
}
