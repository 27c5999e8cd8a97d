//! Groundedness and answer-relevance grading through a chat model

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{complete, join_chunks};
use crate::domain::DomainError;
use crate::domain::grading::prompts::{
    self, ANSWER_RELEVANCE_SYSTEM, ANSWER_RELEVANCE_USER, BinaryScore, GROUNDEDNESS_SYSTEM,
    GROUNDEDNESS_USER,
};
use crate::domain::grading::{AnswerGrader, AnswerVerdict};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::retrieval::DocumentChunk;

/// Runs the groundedness and relevance prompts concurrently
#[derive(Debug, Clone)]
pub struct LlmAnswerGrader {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl LlmAnswerGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn judge(&self, system: &str, user: String) -> Result<BinaryScore, DomainError> {
        let request = LlmRequest::builder()
            .system(system)
            .user(user)
            .temperature(self.temperature)
            .max_tokens(150)
            .build();

        let reply = complete(&self.provider, &self.model, request).await?;
        Ok(prompts::parse_binary_score(&reply))
    }
}

#[async_trait]
impl AnswerGrader for LlmAnswerGrader {
    async fn grade(
        &self,
        question: &str,
        chunks: &[DocumentChunk],
        answer: &str,
    ) -> Result<AnswerVerdict, DomainError> {
        let documents = join_chunks(chunks);

        let grounded = self.judge(
            GROUNDEDNESS_SYSTEM,
            prompts::render(
                GROUNDEDNESS_USER,
                &[("documents", &documents), ("generation", answer)],
            ),
        );
        let relevant = self.judge(
            ANSWER_RELEVANCE_SYSTEM,
            prompts::render(
                ANSWER_RELEVANCE_USER,
                &[("question", question), ("generation", answer)],
            ),
        );

        let (grounded, relevant) = tokio::join!(grounded, relevant);
        let (grounded, relevant) = (grounded?, relevant?);

        debug!(
            grounded = grounded.yes,
            relevant = relevant.yes,
            "Answer graded"
        );

        let rationale: Vec<String> = [("grounded", grounded.reason), ("relevant", relevant.reason)]
            .into_iter()
            .filter_map(|(label, reason)| reason.map(|r| format!("{}: {}", label, r)))
            .collect();

        let verdict = AnswerVerdict::new(grounded.yes, relevant.yes);
        Ok(if rationale.is_empty() {
            verdict
        } else {
            verdict.with_rationale(rationale.join("; "))
        })
    }

    fn grader_name(&self) -> &'static str {
        "llm"
    }
}
