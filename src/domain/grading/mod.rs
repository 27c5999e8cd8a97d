//! Grading, generation, and rewriting contracts used by the correction loop

mod answer;
mod generation;
pub mod prompts;
mod relevance;
mod rewrite;

pub use answer::{AnswerGrader, AnswerVerdict};
pub use generation::{AnswerGenerator, Generation, INSUFFICIENT_INFORMATION_ANSWER};
pub use relevance::{
    GradedChunk, RelevanceGrader, RelevanceStrategy, RelevanceThresholds, RelevanceVerdict,
};
pub use rewrite::{QueryRewriter, RewriteContext, RewriteReason};

#[cfg(test)]
pub use answer::mock::MockAnswerGrader;
#[cfg(test)]
pub use generation::mock::MockAnswerGenerator;
#[cfg(test)]
pub use relevance::mock::MockRelevanceGrader;
#[cfg(test)]
pub use rewrite::mock::MockQueryRewriter;
