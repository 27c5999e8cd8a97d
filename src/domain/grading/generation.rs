//! Answer generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;
use crate::domain::retrieval::DocumentChunk;

/// Canonical answer when the documents cannot answer the question
pub const INSUFFICIENT_INFORMATION_ANSWER: &str =
    "I don't have enough information in the provided documents to answer that question.";

/// Output of an answer generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Generation {
    Answer(String),
    /// The generator refused because it had no context to work from
    CannotAnswer,
}

/// Produces a candidate answer from a query and context chunks
///
/// Must return [`Generation::CannotAnswer`] instead of calling a model when
/// `chunks` is empty.
#[async_trait]
pub trait AnswerGenerator: Send + Sync + Debug {
    async fn generate(
        &self,
        query: &str,
        chunks: &[DocumentChunk],
    ) -> Result<Generation, DomainError>;

    /// Get the generator name
    fn generator_name(&self) -> &'static str;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_serialization() {
        assert_eq!(
            serde_json::to_value(Generation::Answer("Paris.".into())).unwrap(),
            serde_json::json!({"kind": "answer", "text": "Paris."})
        );
        assert_eq!(
            serde_json::to_value(Generation::CannotAnswer).unwrap(),
            serde_json::json!({"kind": "cannot_answer"})
        );
    }
}
