//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, EmbeddingSettings, IngestionSettings, LlmProviderKind, LlmSettings, LogFormat,
    LoggingConfig, ServerConfig,
};
