use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};
use crate::infrastructure::workflow::EngineConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub engine: EngineSettings,
    pub storage: StorageSettings,
    pub reply: ReplyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Execution engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upper bound on one agent judgment, in milliseconds
    pub judgment_timeout_ms: u64,
    pub max_cascade_depth: usize,
    /// Host event channel capacity
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub kind: String,
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Chat server used for agent actions and judgments
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Unset disables reply generation
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            judgment_timeout_ms: 10_000,
            max_cascade_depth: 16,
            event_buffer: 256,
        }
    }
}

impl EngineSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            judgment_timeout: Duration::from_millis(self.judgment_timeout_ms),
            max_cascade_depth: self.max_cascade_depth,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            url: None,
            max_connections: 10,
        }
    }
}

impl StorageSettings {
    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        let storage_type = StorageType::from_str(&self.kind).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage kind: {}", self.kind))
        })?;

        match storage_type {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => {
                let url = self.url.clone().ok_or_else(|| {
                    DomainError::configuration("storage.url is required for postgres")
                })?;
                Ok(StorageConfig::postgres(
                    PostgresConfig::new(url).with_max_connections(self.max_connections),
                ))
            }
        }
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(source: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.engine_config().judgment_timeout, Duration::from_secs(10));
        assert_eq!(config.engine.max_cascade_depth, 16);
        assert!(config.reply.base_url.is_none());
        assert!(matches!(config.storage.storage_config(), Ok(StorageConfig::InMemory)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_toml(
            r#"
            [logging]
            format = "json"

            [engine]
            judgment_timeout_ms = 250
            "#,
        );

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.judgment_timeout_ms, 250);
        assert_eq!(config.engine.event_buffer, 256);
    }

    #[test]
    fn test_postgres_requires_url() {
        let settings = StorageSettings {
            kind: "postgres".to_string(),
            ..StorageSettings::default()
        };
        assert!(settings.storage_config().is_err());

        let settings = StorageSettings {
            url: Some("postgres://db/engine".to_string()),
            max_connections: 4,
            ..settings
        };
        match settings.storage_config().unwrap() {
            StorageConfig::Postgres(pg) => {
                assert_eq!(pg.url, "postgres://db/engine");
                assert_eq!(pg.max_connections, 4);
            }
            other => panic!("expected postgres, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_storage_kind() {
        let settings = StorageSettings {
            kind: "dynamo".to_string(),
            ..StorageSettings::default()
        };
        assert!(settings.storage_config().is_err());
    }
}
