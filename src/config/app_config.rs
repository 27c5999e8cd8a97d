use serde::Deserialize;

use crate::domain::correction::CorrectionConfig;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub correction: CorrectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
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

/// Which chat/embedding backend to use
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// OpenAI when an API key is available, otherwise Ollama
    #[default]
    Auto,
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProviderKind,
    /// Falls back to `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// OpenAI model for generation and rewriting
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    /// OpenAI model for relevance and answer grading
    #[serde(default = "default_grader_model")]
    pub grader_model: String,
    /// Ollama model for every role
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    /// OpenAI embedding model
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_ollama_embedding_model")]
    pub ollama_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Chunks returned per retrieval
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Texts per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
    /// Retrieved chunks scoring below this similarity are dropped
    #[serde(default)]
    pub min_score: Option<f32>,
}

fn default_generation_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_grader_model() -> String {
    "gpt-4".to_string()
}

fn default_ollama_model() -> String {
    "mistral".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_chunk_size() -> usize {
    1200
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

fn default_embedding_batch_size() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            api_key: None,
            base_url: None,
            generation_model: default_generation_model(),
            grader_model: default_grader_model(),
            ollama_model: default_ollama_model(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            ollama_model: default_ollama_embedding_model(),
        }
    }
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embedding_batch_size: default_embedding_batch_size(),
            min_score: None,
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

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.provider, LlmProviderKind::Auto);
        assert_eq!(config.llm.generation_model, "gpt-3.5-turbo");
        assert_eq!(config.llm.grader_model, "gpt-4");
        assert_eq!(config.llm.ollama_model, "mistral");
        assert_eq!(config.embedding.ollama_model, "nomic-embed-text");
        assert_eq!(config.ingestion.chunk_size, 1200);
        assert_eq!(config.ingestion.chunk_overlap, 200);
        assert_eq!(config.correction.max_retrieval_attempts, 3);
    }

    #[test]
    fn test_layered_sources() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                host = "127.0.0.1"
                port = 9000

                [llm]
                provider = "ollama"

                [ingestion]
                min_score = 0.25

                [correction]
                max_generation_attempts = 5
                relevance_strategy = "hybrid"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.provider, LlmProviderKind::Ollama);
        assert_eq!(config.correction.max_generation_attempts, 5);
        assert_eq!(config.correction.max_retrieval_attempts, 3);
        assert_eq!(config.ingestion.top_k, 4);
        assert_eq!(config.ingestion.min_score, Some(0.25));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
