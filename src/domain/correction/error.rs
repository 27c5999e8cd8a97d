//! Correction loop errors

use std::fmt;

use thiserror::Error;

use super::state::LoopStep;
use crate::domain::DomainError;

/// Collaborators the loop depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Retriever,
    RelevanceGrader,
    Generator,
    AnswerGrader,
    Rewriter,
}

impl Collaborator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retriever => "retriever",
            Self::RelevanceGrader => "relevance_grader",
            Self::Generator => "generator",
            Self::AnswerGrader => "answer_grader",
            Self::Rewriter => "rewriter",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a correction run
///
/// Exhausted retries and empty retrieval are not errors; they are reported
/// through the run's termination reason.
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("Question must not be empty")]
    InvalidQuestion,

    #[error("{collaborator} unavailable during {step}: {source}")]
    CollaboratorUnavailable {
        collaborator: Collaborator,
        step: LoopStep,
        source: DomainError,
    },
}

impl CorrectionError {
    pub fn unavailable(collaborator: Collaborator, step: LoopStep, source: DomainError) -> Self {
        Self::CollaboratorUnavailable {
            collaborator,
            step,
            source,
        }
    }

    /// The failing collaborator, if any
    pub fn collaborator(&self) -> Option<Collaborator> {
        match self {
            Self::CollaboratorUnavailable { collaborator, .. } => Some(*collaborator),
            Self::InvalidQuestion => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = CorrectionError::unavailable(
            Collaborator::AnswerGrader,
            LoopStep::GradeAnswer,
            DomainError::provider("openai", "timeout"),
        );

        assert_eq!(
            err.to_string(),
            "answer_grader unavailable during GRADE_ANSWER: Provider error: openai - timeout"
        );
        assert_eq!(err.collaborator(), Some(Collaborator::AnswerGrader));
        assert!(std::error::Error::source(&err).is_some());
    }
}
