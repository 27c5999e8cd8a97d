//! OpenAI-compatible embeddings provider (OpenAI and Ollama)

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::DomainError;
use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
};
use crate::infrastructure::llm::{DEFAULT_OLLAMA_BASE_URL, DEFAULT_OPENAI_BASE_URL};

/// Embedding provider speaking the OpenAI `/v1/embeddings` wire format
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    name: &'static str,
    auth_header: Option<String>,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            name: "openai",
            auth_header: Some(format!("Bearer {}", api_key.into())),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Local Ollama server
    pub fn ollama(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            name: "ollama",
            auth_header: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Ollama on its default port
    pub fn local_ollama(client: C) -> Self {
        Self::ollama(client, DEFAULT_OLLAMA_BASE_URL)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];

        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }

        headers
    }

    fn build_request(&self, request: &EmbeddingRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model(),
            "input": request.inputs(),
        });

        if let Some(dims) = request.dimensions() {
            body["dimensions"] = serde_json::json!(dims);
        }

        body
    }

    fn parse_response(
        &self,
        expected: usize,
        json: serde_json::Value,
    ) -> Result<EmbeddingResponse, DomainError> {
        let response: WireEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(self.name, format!("Failed to parse embedding response: {}", e))
        })?;

        if response.data.len() != expected {
            return Err(DomainError::provider(
                self.name,
                format!(
                    "Expected {} embeddings, got {}",
                    expected,
                    response.data.len()
                ),
            ));
        }

        let embeddings = response
            .data
            .into_iter()
            .map(|d| Embedding::new(d.index, d.embedding))
            .collect();

        let prompt_tokens = response.usage.map(|u| u.prompt_tokens).unwrap_or(0);

        Ok(EmbeddingResponse::new(response.model, embeddings, prompt_tokens))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        if request.is_empty() {
            return Ok(EmbeddingResponse::new(request.model().to_string(), vec![], 0));
        }

        let url = self.embeddings_url();
        let body = self.build_request(&request);

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| DomainError::provider(self.name, e.to_string()))?;

        self.parse_response(request.inputs().len(), response)
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Deserialize)]
struct WireEmbeddingResponse {
    #[serde(default)]
    model: String,
    data: Vec<WireEmbedding>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
}
