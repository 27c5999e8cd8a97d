//! Answer generation through a chat model

use std::sync::Arc;

use async_trait::async_trait;

use super::{complete, join_chunks};
use crate::domain::DomainError;
use crate::domain::grading::prompts::{self, GENERATION_PROMPT};
use crate::domain::grading::{AnswerGenerator, Generation};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::retrieval::DocumentChunk;

#[derive(Debug, Clone)]
pub struct LlmAnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmAnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: 512,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(
        &self,
        query: &str,
        chunks: &[DocumentChunk],
    ) -> Result<Generation, DomainError> {
        if chunks.is_empty() {
            return Ok(Generation::CannotAnswer);
        }

        let context = join_chunks(chunks);
        let request = LlmRequest::builder()
            .user(prompts::render(
                GENERATION_PROMPT,
                &[("question", query), ("context", &context)],
            ))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        let answer = complete(&self.provider, &self.model, request).await?;

        Ok(Generation::Answer(answer.trim().to_string()))
    }

    fn generator_name(&self) -> &'static str {
        "llm"
    }
}
