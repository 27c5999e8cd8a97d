//! Correction loop configuration

use serde::{Deserialize, Serialize};

use crate::domain::grading::{RelevanceStrategy, RelevanceThresholds};

/// Bounds and grading policy for one correction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Retrieval attempts allowed per run, counting the first (minimum 1)
    #[serde(default = "default_max_attempts")]
    pub max_retrieval_attempts: u32,
    /// Generation cycles allowed per run, counting the first (minimum 1)
    #[serde(default = "default_max_attempts")]
    pub max_generation_attempts: u32,
    /// Relevant chunks needed before generating
    #[serde(default = "default_min_relevant_chunks")]
    pub min_relevant_chunks: usize,
    /// Whether ambiguous chunks count as relevant
    #[serde(default = "default_true")]
    pub include_ambiguous: bool,
    /// Chunks graded in parallel within one run
    #[serde(default = "default_grading_concurrency")]
    pub grading_concurrency: usize,
    #[serde(default)]
    pub relevance_strategy: RelevanceStrategy,
    #[serde(default)]
    pub relevance_thresholds: RelevanceThresholds,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_relevant_chunks() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_grading_concurrency() -> usize {
    4
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_retrieval_attempts: default_max_attempts(),
            max_generation_attempts: default_max_attempts(),
            min_relevant_chunks: default_min_relevant_chunks(),
            include_ambiguous: default_true(),
            grading_concurrency: default_grading_concurrency(),
            relevance_strategy: RelevanceStrategy::default(),
            relevance_thresholds: RelevanceThresholds::default(),
        }
    }
}

impl CorrectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retrieval_attempts(mut self, attempts: u32) -> Self {
        self.max_retrieval_attempts = attempts;
        self
    }

    pub fn with_max_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_generation_attempts = attempts;
        self
    }

    pub fn with_min_relevant_chunks(mut self, min: usize) -> Self {
        self.min_relevant_chunks = min;
        self
    }

    pub fn with_include_ambiguous(mut self, include: bool) -> Self {
        self.include_ambiguous = include;
        self
    }

    pub fn with_grading_concurrency(mut self, concurrency: usize) -> Self {
        self.grading_concurrency = concurrency;
        self
    }

    pub fn with_relevance_strategy(mut self, strategy: RelevanceStrategy) -> Self {
        self.relevance_strategy = strategy;
        self
    }

    pub fn retrieval_limit(&self) -> u32 {
        self.max_retrieval_attempts.max(1)
    }

    pub fn generation_limit(&self) -> u32 {
        self.max_generation_attempts.max(1)
    }

    pub fn concurrency(&self) -> usize {
        self.grading_concurrency.max(1)
    }

    /// Upper bound on state transitions for one run
    ///
    /// A retrieval retry costs three transitions and a generation cycle at most
    /// five; the constant covers the final retrieval and grading.
    pub fn transition_limit(&self) -> usize {
        3 * self.retrieval_limit() as usize + 5 * self.generation_limit() as usize + 4
    }
}
