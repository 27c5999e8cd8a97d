//! Document relevance grading

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;
use crate::domain::retrieval::DocumentChunk;

/// Relevance of one chunk to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceVerdict {
    Relevant,
    /// The grader could not decide
    Ambiguous,
    Irrelevant,
}

impl RelevanceVerdict {
    /// Reduce to a boolean; ambiguous counts only when `include_ambiguous` is set
    pub fn is_relevant(&self, include_ambiguous: bool) -> bool {
        match self {
            Self::Relevant => true,
            Self::Ambiguous => include_ambiguous,
            Self::Irrelevant => false,
        }
    }

    pub fn from_bool(relevant: bool) -> Self {
        if relevant {
            Self::Relevant
        } else {
            Self::Irrelevant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevant => "relevant",
            Self::Ambiguous => "ambiguous",
            Self::Irrelevant => "irrelevant",
        }
    }
}

/// Similarity cut-offs used by score-based grading
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelevanceThresholds {
    /// Scores at or above this are relevant
    #[serde(default = "default_relevant_threshold")]
    pub relevant: f32,
    /// Scores at or above this (and below `relevant`) are ambiguous
    #[serde(default = "default_ambiguous_threshold")]
    pub ambiguous: f32,
}

fn default_relevant_threshold() -> f32 {
    0.8
}

fn default_ambiguous_threshold() -> f32 {
    0.5
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            relevant: default_relevant_threshold(),
            ambiguous: default_ambiguous_threshold(),
        }
    }
}

impl RelevanceThresholds {
    pub fn classify(&self, score: f32) -> RelevanceVerdict {
        if score >= self.relevant {
            RelevanceVerdict::Relevant
        } else if score >= self.ambiguous {
            RelevanceVerdict::Ambiguous
        } else {
            RelevanceVerdict::Irrelevant
        }
    }
}

/// How chunk relevance is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceStrategy {
    /// Ask a language model for a yes/no judgement
    #[default]
    Llm,
    /// Similarity score cut-offs only, no model call
    Threshold,
    /// Cut-offs first, the model only for ambiguous chunks
    Hybrid,
    /// Literal keyword overlap, no model call
    Keyword,
}

/// A chunk with its relevance verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedChunk {
    pub chunk: DocumentChunk,
    pub verdict: RelevanceVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl GradedChunk {
    pub fn new(chunk: DocumentChunk, verdict: RelevanceVerdict) -> Self {
        Self {
            chunk,
            verdict,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn is_relevant(&self, include_ambiguous: bool) -> bool {
        self.verdict.is_relevant(include_ambiguous)
    }
}

/// Grades a single (query, chunk) pair
///
/// Implementations keep no state between calls, so chunks of one query may be
/// graded in any order or concurrently.
#[async_trait]
pub trait RelevanceGrader: Send + Sync + Debug {
    async fn grade(&self, query: &str, chunk: &DocumentChunk) -> Result<GradedChunk, DomainError>;

    /// Get the grader name
    fn grader_name(&self) -> &'static str;
}
