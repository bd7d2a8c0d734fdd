mod app_config;

pub use app_config::{
    AppConfig, EngineSettings, LogFormat, LoggingConfig, ReplyConfig, StorageSettings,
};
