//! Run-scoped state of the correction loop

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::grading::{
    AnswerVerdict, GradedChunk, Generation, INSUFFICIENT_INFORMATION_ANSWER, RewriteReason,
};
use crate::domain::retrieval::DocumentChunk;

/// States of the correction loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopStep {
    #[serde(rename = "RETRIEVE")]
    Retrieve,
    #[serde(rename = "GRADE_DOCS")]
    GradeDocuments,
    #[serde(rename = "REWRITE_FOR_RETRIEVAL")]
    RewriteForRetrieval,
    #[serde(rename = "GENERATE")]
    Generate,
    #[serde(rename = "GRADE_ANSWER")]
    GradeAnswer,
    #[serde(rename = "REWRITE_FOR_GENERATION")]
    RewriteForGeneration,
    #[serde(rename = "DONE")]
    Done,
}

impl LoopStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieve => "RETRIEVE",
            Self::GradeDocuments => "GRADE_DOCS",
            Self::RewriteForRetrieval => "REWRITE_FOR_RETRIEVAL",
            Self::Generate => "GENERATE",
            Self::GradeAnswer => "GRADE_ANSWER",
            Self::RewriteForGeneration => "REWRITE_FOR_GENERATION",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for LoopStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the run trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: LoopStep,
    pub timestamp: DateTime<Utc>,
    /// Short human-readable progress message
    pub status: String,
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Grounded and relevant answer
    Accepted,
    /// Attempts exhausted; the best answer is grounded but off-topic
    BestEffort,
    /// Attempts exhausted; the best answer is not grounded
    LowConfidence,
    /// Nothing usable was retrieved or generated
    InsufficientInformation,
    /// The rewriter could not change the question
    RewriteStagnation,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::BestEffort => "best_effort",
            Self::LowConfidence => "low_confidence",
            Self::InsufficientInformation => "insufficient_information",
            Self::RewriteStagnation => "rewrite_stagnation",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Accepted => "Answer accepted",
            Self::BestEffort => "Attempts exhausted, returning best-effort answer",
            Self::LowConfidence => "Attempts exhausted, returning low-confidence answer",
            Self::InsufficientInformation => "No relevant information found in the documents",
            Self::RewriteStagnation => "Question could not be rewritten, returning best answer so far",
        }
    }
}

/// Confidence the caller should attach to the returned answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerConfidence {
    High,
    BestEffort,
    Low,
    /// No answer was produced; the text is the insufficient-information sentinel
    None,
}

impl AnswerConfidence {
    /// Derive from the verdict of the answer being returned
    pub fn from_verdict(verdict: Option<&AnswerVerdict>) -> Self {
        match verdict {
            Some(v) if v.is_accepted() => Self::High,
            Some(v) if v.grounded => Self::BestEffort,
            Some(_) => Self::Low,
            None => Self::None,
        }
    }
}

/// Highest-ranked graded answer seen so far in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestAnswer {
    pub answer: String,
    pub verdict: AnswerVerdict,
    /// Query that produced the answer
    pub query: String,
    pub sources: Vec<String>,
}

/// Final answer of a run, set once when the loop reaches `DONE`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub termination: Termination,
    pub answer: String,
    pub verdict: Option<AnswerVerdict>,
    pub sources: Vec<String>,
}

impl Outcome {
    pub fn from_best(termination: Termination, best: BestAnswer) -> Self {
        Self {
            termination,
            answer: best.answer,
            verdict: Some(best.verdict),
            sources: best.sources,
        }
    }

    pub fn insufficient_information(termination: Termination) -> Self {
        Self {
            termination,
            answer: INSUFFICIENT_INFORMATION_ANSWER.to_string(),
            verdict: None,
            sources: Vec::new(),
        }
    }

    pub fn confidence(&self) -> AnswerConfidence {
        AnswerConfidence::from_verdict(self.verdict.as_ref())
    }
}

/// Mutable record of one run
///
/// Created per question and owned by the loop; it never outlives the run.
#[derive(Debug, Clone)]
pub struct LoopState {
    pub original_question: String,
    /// Current working query (the original question until the first rewrite)
    pub query: String,
    /// Retrieval attempts made, counting the first
    pub retrieval_attempts: u32,
    /// Generation cycles started, counting the first
    pub generation_attempts: u32,
    /// Chunks from the latest retrieval
    pub retrieved: Vec<DocumentChunk>,
    /// Verdicts for `retrieved`, in retrieval order
    pub graded: Vec<GradedChunk>,
    /// Chunks handed to the generator
    pub context: Vec<DocumentChunk>,
    pub candidate: Option<Generation>,
    pub verdict: Option<AnswerVerdict>,
    /// Reason for the rewrite the loop is about to perform
    pub pending_rewrite: Option<RewriteReason>,
    /// Rewriter output awaiting the stagnation check
    pub rewritten: Option<String>,
    /// Reason of every rewrite requested so far, in order
    pub rewrite_reasons: Vec<RewriteReason>,
    pub best: Option<BestAnswer>,
    pub outcome: Option<Outcome>,
    trace: Vec<TraceEntry>,
}

impl LoopState {
    pub fn new(original_question: impl Into<String>) -> Self {
        let original_question = original_question.into();

        Self {
            query: original_question.clone(),
            original_question,
            retrieval_attempts: 1,
            generation_attempts: 1,
            retrieved: Vec::new(),
            graded: Vec::new(),
            context: Vec::new(),
            candidate: None,
            verdict: None,
            pending_rewrite: None,
            rewritten: None,
            rewrite_reasons: Vec::new(),
            best: None,
            outcome: None,
            trace: Vec::new(),
        }
    }

    /// Append a trace entry stamped with the current time
    pub fn record(&mut self, step: LoopStep, status: impl Into<String>) {
        self.trace.push(TraceEntry {
            step,
            timestamp: Utc::now(),
            status: status.into(),
        });
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<TraceEntry> {
        self.trace
    }

    /// Rewrites performed so far in this run
    pub fn rewrites(&self) -> u32 {
        (self.retrieval_attempts - 1) + (self.generation_attempts - 1)
    }

    /// Chunks flagged relevant by the latest grading
    pub fn relevant_chunks(&self, include_ambiguous: bool) -> Vec<DocumentChunk> {
        self.graded
            .iter()
            .filter(|g| g.is_relevant(include_ambiguous))
            .map(|g| g.chunk.clone())
            .collect()
    }

    /// Distinct sources of the current context, in first-seen order
    pub fn context_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for chunk in &self.context {
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }
        sources
    }

    /// Keep `answer` if it ranks at least as high as the current best
    pub fn offer_best(&mut self, answer: &str, verdict: &AnswerVerdict) {
        let replace = self
            .best
            .as_ref()
            .is_none_or(|best| verdict.rank() >= best.verdict.rank());

        if replace {
            self.best = Some(BestAnswer {
                answer: answer.to_string(),
                verdict: verdict.clone(),
                query: self.query.clone(),
                sources: self.context_sources(),
            });
        }
    }

    /// Drop everything derived from the previous query
    pub fn reset_iteration(&mut self) {
        self.retrieved.clear();
        self.graded.clear();
        self.context.clear();
        self.candidate = None;
        self.verdict = None;
        self.pending_rewrite = None;
        self.rewritten = None;
    }
}
