//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::storage::{apply_patch, row_id, stamp_new_row, Row, RowFilter, Storage};
use crate::domain::DomainError;

/// Thread-safe in-memory table store
///
/// Useful for testing, fixtures and development. Data is lost when the process terminates.
/// Rows keep insertion order within a table.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-populated with rows, keyed by table name
    pub fn with_tables(tables: HashMap<String, Vec<Row>>) -> Self {
        let tables = tables
            .into_iter()
            .map(|(table, rows)| (table, rows.into_iter().map(stamp_new_row).collect()))
            .collect();

        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Snapshot of every table, used to dump fixtures
    pub fn snapshot(&self) -> Result<HashMap<String, Vec<Row>>, DomainError> {
        let tables = self.tables.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(tables.clone())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, table: &str, filter: &RowFilter) -> Result<Vec<Row>, DomainError> {
        let tables = self.tables.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, table: &str, row: Row) -> Result<Row, DomainError> {
        let row = stamp_new_row(row);
        let mut tables = self.tables.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;
        let rows = tables.entry(table.to_string()).or_default();

        if rows.iter().any(|r| row_id(r) == row_id(&row)) {
            return Err(DomainError::conflict(format!(
                "Row with id '{}' already exists in '{}'",
                row_id(&row).unwrap_or_default(),
                table
            )));
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, DomainError> {
        let mut tables = self.tables.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| {
                DomainError::not_found(format!("Row with id '{}' not found in '{}'", id, table))
            })?;

        apply_patch(row, patch);
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };

        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        Ok(rows.len() < before)
    }
}
