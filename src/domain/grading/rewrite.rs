//! Query rewriting

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Why a rewrite was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteReason {
    /// Retrieval produced no relevant chunks
    NoRelevantDocuments,
    /// The generated answer was not supported by the context
    Ungrounded,
    /// The generated answer did not address the question
    OffTopic,
}

impl RewriteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRelevantDocuments => "no_relevant_documents",
            Self::Ungrounded => "ungrounded",
            Self::OffTopic => "off_topic",
        }
    }

    /// Phrase given to the rewriting model
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NoRelevantDocuments => {
                "the previous search returned no documents relevant to the question"
            }
            Self::Ungrounded => "the previous answer was not supported by the retrieved documents",
            Self::OffTopic => "the previous answer did not address the question",
        }
    }
}

/// Failure context handed to the rewriter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteContext {
    pub reason: RewriteReason,
    /// 1-based count of rewrites requested so far in this run
    pub attempt: u32,
}

impl RewriteContext {
    pub fn new(reason: RewriteReason, attempt: u32) -> Self {
        Self { reason, attempt }
    }
}

/// Reformulates the original question for better retrieval
///
/// Always rewrites from the user's original question, never from an earlier rewrite.
#[async_trait]
pub trait QueryRewriter: Send + Sync + Debug {
    async fn rewrite(
        &self,
        original_question: &str,
        context: &RewriteContext,
    ) -> Result<String, DomainError>;

    /// Get the rewriter name
    fn rewriter_name(&self) -> &'static str;
}
