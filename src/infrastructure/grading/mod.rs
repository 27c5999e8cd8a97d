//! Model-backed and heuristic implementations of the grading contracts

mod answer_grader;
mod generator;
mod relevance;
mod rewriter;

use std::sync::Arc;

pub use answer_grader::LlmAnswerGrader;
pub use generator::LlmAnswerGenerator;
pub use relevance::{
    HybridRelevanceGrader, KeywordRelevanceGrader, LlmRelevanceGrader, ThresholdRelevanceGrader,
    relevance_grader_for,
};
pub use rewriter::LlmQueryRewriter;

use crate::domain::DomainError;
use crate::domain::llm::{LlmProvider, LlmRequest};

/// Send a request and return the non-blank reply text
async fn complete(
    provider: &Arc<dyn LlmProvider>,
    model: &str,
    request: LlmRequest,
) -> Result<String, DomainError> {
    let response = provider.chat(model, request).await?;

    response
        .content()
        .map(str::to_string)
        .ok_or_else(|| DomainError::provider(provider.provider_name(), "Empty response from model"))
}

fn join_chunks(chunks: &[crate::domain::retrieval::DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
