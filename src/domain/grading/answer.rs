//! Answer quality grading

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;
use crate::domain::retrieval::DocumentChunk;

/// Two independent judgements on a candidate answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerVerdict {
    /// Every claim is supported by the context chunks
    pub grounded: bool,
    /// The answer addresses the original question
    pub relevant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl AnswerVerdict {
    pub fn new(grounded: bool, relevant: bool) -> Self {
        Self {
            grounded,
            relevant,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.grounded && self.relevant
    }

    /// Ordering used to keep the best answer: grounded outranks relevant
    pub fn rank(&self) -> u8 {
        match (self.grounded, self.relevant) {
            (true, true) => 3,
            (true, false) => 2,
            (false, true) => 1,
            (false, false) => 0,
        }
    }
}

/// Judges a candidate answer for groundedness and relevance
#[async_trait]
pub trait AnswerGrader: Send + Sync + Debug {
    /// `question` is the user's original question, not a rewritten query
    async fn grade(
        &self,
        question: &str,
        chunks: &[DocumentChunk],
        answer: &str,
    ) -> Result<AnswerVerdict, DomainError>;

    /// Get the grader name
    fn grader_name(&self) -> &'static str;
}
