//! PostgreSQL storage implementation with connection pooling

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row as _;

use crate::domain::storage::{row_id, stamp_new_row, tables, Row, RowFilter, Storage};
use crate::domain::DomainError;

/// Table names are interpolated into SQL, so only plain identifiers are accepted
static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("valid table name pattern"));

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/workflow_engine".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// PostgreSQL storage implementation with connection pooling
///
/// Every logical table is a physical table of `(seq, id, data JSONB)` rows.
/// Filters become JSONB containment (`data @> filter`), patches a JSONB merge.
pub struct PostgresStorage {
    pool: PgPool,
}

impl Debug for PostgresStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new PostgreSQL storage with connection pooling
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures every engine table exists
    pub async fn ensure_tables(&self) -> Result<(), DomainError> {
        for table in tables::ALL {
            self.ensure_table(table).await?;
        }
        Ok(())
    }

    pub async fn ensure_table(&self, table: &str) -> Result<(), DomainError> {
        let table = checked_table(table)?;
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                seq BIGSERIAL,
                id VARCHAR(255) PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table '{}': {}", table, e)))?;

        Ok(())
    }
}

fn checked_table(table: &str) -> Result<&str, DomainError> {
    if TABLE_NAME.is_match(table) {
        Ok(table)
    } else {
        Err(DomainError::validation(format!("Invalid table name '{}'", table)))
    }
}

fn into_row(data: Value) -> Result<Row, DomainError> {
    match data {
        Value::Object(row) => Ok(row),
        other => Err(DomainError::storage(format!(
            "Stored row is not a JSON object: {}",
            other
        ))),
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn get(&self, table: &str, filter: &RowFilter) -> Result<Vec<Row>, DomainError> {
        let table = checked_table(table)?;
        let query = format!("SELECT data FROM {table} WHERE data @> $1 ORDER BY seq");

        let rows = sqlx::query(&query)
            .bind(filter.to_json())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to query '{}': {}", table, e)))?;

        rows.into_iter()
            .map(|row| into_row(row.get("data")))
            .collect()
    }

    async fn create(&self, table: &str, row: Row) -> Result<Row, DomainError> {
        let table = checked_table(table)?;
        let row = stamp_new_row(row);
        let id = row_id(&row).unwrap_or_default().to_string();
        let query = format!("INSERT INTO {table} (id, data) VALUES ($1, $2)");

        sqlx::query(&query)
            .bind(&id)
            .bind(Value::Object(row.clone()))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("duplicate key") {
                    DomainError::conflict(format!("Row with id '{}' already exists in '{}'", id, table))
                } else {
                    DomainError::storage(format!("Failed to insert into '{}': {}", table, e))
                }
            })?;

        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, mut patch: Row) -> Result<Row, DomainError> {
        let table = checked_table(table)?;
        patch.remove("id");
        let query = format!(
            "UPDATE {table} SET data = data || $2, updated_at = NOW() WHERE id = $1 RETURNING data"
        );

        let updated = sqlx::query(&query)
            .bind(id)
            .bind(Value::Object(patch))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update '{}': {}", table, e)))?;

        match updated {
            Some(row) => into_row(row.get("data")),
            None => Err(DomainError::not_found(format!(
                "Row with id '{}' not found in '{}'",
                id, table
            ))),
        }
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, DomainError> {
        let table = checked_table(table)?;
        let query = format!("DELETE FROM {table} WHERE id = $1");

        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete from '{}': {}", table, e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_default() {
        let config = PostgresConfig::default();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.idle_timeout_secs, 600);
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://localhost/test")
            .with_max_connections(20)
            .with_min_connections(5)
            .with_connect_timeout(60);

        assert_eq!(config.url, "postgres://localhost/test");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.connect_timeout_secs, 60);
    }

    #[test]
    fn test_table_names_are_checked() {
        for table in tables::ALL {
            assert!(checked_table(table).is_ok());
        }
        assert!(checked_table("steps; DROP TABLE users").is_err());
        assert!(checked_table("Steps").is_err());
        assert!(checked_table("").is_err());
    }

    #[test]
    fn test_into_row_rejects_scalars() {
        assert!(into_row(serde_json::json!({"id": "a"})).is_ok());
        assert!(into_row(serde_json::json!(3)).is_err());
    }
}
