//! Model backend selection (OpenAI or a local Ollama server)

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::http_client::HttpClient;
use super::openai::{DEFAULT_OLLAMA_BASE_URL, OpenAiProvider};
use crate::config::{EmbeddingSettings, LlmProviderKind, LlmSettings};
use crate::domain::DomainError;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::llm::LlmProvider;
use crate::infrastructure::embedding::OpenAiEmbeddingProvider;

/// Environment variable consulted when no API key is configured
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Backend chosen after looking at configuration and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBackend {
    OpenAi { api_key: String },
    Ollama,
}

impl ResolvedBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Ollama => "ollama",
        }
    }
}

/// Providers and the model name each role should use
#[derive(Debug, Clone)]
pub struct ModelBackends {
    pub backend: &'static str,
    pub chat: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generation_model: String,
    pub grader_model: String,
    pub embedding_model: String,
}

/// Factory for chat and embedding providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Decide between OpenAI and Ollama
    ///
    /// `auto` picks OpenAI when a key is configured or present in the environment.
    pub fn resolve(
        settings: &LlmSettings,
        env_api_key: Option<String>,
    ) -> Result<ResolvedBackend, DomainError> {
        let api_key = settings
            .api_key
            .clone()
            .or(env_api_key)
            .filter(|key| !key.trim().is_empty());

        match (settings.provider, api_key) {
            (LlmProviderKind::Ollama, _) => Ok(ResolvedBackend::Ollama),
            (LlmProviderKind::OpenAi | LlmProviderKind::Auto, Some(api_key)) => {
                Ok(ResolvedBackend::OpenAi { api_key })
            }
            (LlmProviderKind::OpenAi, None) => Err(DomainError::configuration(format!(
                "OpenAI provider selected but no API key configured (set llm.api_key or {})",
                OPENAI_API_KEY_ENV
            ))),
            (LlmProviderKind::Auto, None) => Ok(ResolvedBackend::Ollama),
        }
    }

    /// Build providers from settings, reading `OPENAI_API_KEY` from the environment
    pub fn create(
        llm: &LlmSettings,
        embedding: &EmbeddingSettings,
    ) -> Result<ModelBackends, DomainError> {
        let backend = Self::resolve(llm, std::env::var(OPENAI_API_KEY_ENV).ok())?;
        Self::create_for(&backend, llm, embedding)
    }

    pub fn create_for(
        backend: &ResolvedBackend,
        llm: &LlmSettings,
        embedding: &EmbeddingSettings,
    ) -> Result<ModelBackends, DomainError> {
        let client = HttpClient::with_timeout(Duration::from_secs(llm.timeout_secs.max(1)))?;

        let backends = match backend {
            ResolvedBackend::OpenAi { api_key } => {
                let (chat, embedder) = match llm.base_url {
                    Some(ref base_url) => (
                        OpenAiProvider::with_base_url(client.clone(), api_key.clone(), base_url),
                        OpenAiEmbeddingProvider::with_base_url(client, api_key.clone(), base_url),
                    ),
                    None => (
                        OpenAiProvider::new(client.clone(), api_key.clone()),
                        OpenAiEmbeddingProvider::new(client, api_key.clone()),
                    ),
                };

                ModelBackends {
                    backend: backend.name(),
                    chat: Arc::new(chat),
                    embedder: Arc::new(embedder),
                    generation_model: llm.generation_model.clone(),
                    grader_model: llm.grader_model.clone(),
                    embedding_model: embedding.model.clone(),
                }
            }
            ResolvedBackend::Ollama => {
                let base_url = llm.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_BASE_URL);

                ModelBackends {
                    backend: backend.name(),
                    chat: Arc::new(OpenAiProvider::ollama(client.clone(), base_url)),
                    embedder: Arc::new(OpenAiEmbeddingProvider::ollama(client, base_url)),
                    generation_model: llm.ollama_model.clone(),
                    grader_model: llm.ollama_model.clone(),
                    embedding_model: embedding.ollama_model.clone(),
                }
            }
        };

        info!(
            backend = backends.backend,
            generation_model = %backends.generation_model,
            grader_model = %backends.grader_model,
            embedding_model = %backends.embedding_model,
            "Model backends configured"
        );

        Ok(backends)
    }
}
