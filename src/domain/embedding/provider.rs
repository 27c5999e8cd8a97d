//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Trait for embedding backends (OpenAI, Ollama, ...)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed every input of the request, preserving batch order via `Embedding::index`
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
