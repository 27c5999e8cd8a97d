//! Query rewriting through a chat model

use std::sync::Arc;

use async_trait::async_trait;

use super::complete;
use crate::domain::DomainError;
use crate::domain::grading::prompts::{self, REWRITE_SYSTEM, REWRITE_USER};
use crate::domain::grading::{QueryRewriter, RewriteContext};
use crate::domain::llm::{LlmProvider, LlmRequest};

#[derive(Debug, Clone)]
pub struct LlmQueryRewriter {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl LlmQueryRewriter {
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
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    async fn rewrite(
        &self,
        original_question: &str,
        context: &RewriteContext,
    ) -> Result<String, DomainError> {
        let attempt = context.attempt.to_string();
        let request = LlmRequest::builder()
            .system(REWRITE_SYSTEM)
            .user(prompts::render(
                REWRITE_USER,
                &[
                    ("question", original_question),
                    ("reason", context.reason.describe()),
                    ("attempt", &attempt),
                ],
            ))
            .temperature(self.temperature)
            .max_tokens(200)
            .build();

        let reply = complete(&self.provider, &self.model, request).await?;

        Ok(prompts::clean_rewrite(&reply))
    }

    fn rewriter_name(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grading::RewriteReason;
    use crate::domain::llm::MockLlmProvider;

    #[tokio::test]
    async fn test_rewrite_is_cleaned() {
        let provider = Arc::new(
            MockLlmProvider::new("mock").with_reply("\"Improved question: Which city is the capital of France?\""),
        );
        let rewriter = LlmQueryRewriter::new(provider.clone(), "gpt-3.5-turbo");

        let rewritten = rewriter
            .rewrite(
                "capital france?",
                &RewriteContext::new(RewriteReason::NoRelevantDocuments, 1),
            )
            .await
            .unwrap();

        assert_eq!(rewritten, "Which city is the capital of France?");
    }

    #[tokio::test]
    async fn test_prompt_carries_reason_and_attempt() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply("better question"));
        let rewriter = LlmQueryRewriter::new(provider.clone(), "gpt-3.5-turbo");

        rewriter
            .rewrite("capital france?", &RewriteContext::new(RewriteReason::OffTopic, 2))
            .await
            .unwrap();

        let prompt = provider.requests()[0].1.full_text();
        assert!(prompt.contains("question re-writer"));
        assert!(prompt.contains("capital france?"));
        assert!(prompt.contains("rewrite attempt 2"));
        assert!(prompt.contains(RewriteReason::OffTopic.describe()));
    }
}
