//! Storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::row::{Row, RowFilter};

/// Generic CRUD collaborator keyed by table name and row-equality filters
///
/// No transactional guarantees are assumed across calls.
#[async_trait]
pub trait Storage: Send + Sync + Debug {
    /// Returns every row of `table` matching `filter`, in insertion order
    async fn get(&self, table: &str, filter: &RowFilter) -> Result<Vec<Row>, DomainError>;

    /// Inserts a row, assigning `id`/`created_at` when missing. Errors if the id exists.
    async fn create(&self, table: &str, row: Row) -> Result<Row, DomainError>;

    /// Applies a shallow patch to the row with the given id, returns the updated row
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, DomainError>;

    /// Deletes a row by id, returns true if deleted
    async fn delete(&self, table: &str, id: &str) -> Result<bool, DomainError>;

    /// Retrieves a single row by id
    async fn get_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, DomainError> {
        let filter = RowFilter::new().eq("id", id);
        Ok(self.get(table, &filter).await?.into_iter().next())
    }

    /// Checks whether any row matches the filter
    async fn exists(&self, table: &str, filter: &RowFilter) -> Result<bool, DomainError> {
        Ok(!self.get(table, filter).await?.is_empty())
    }
}
