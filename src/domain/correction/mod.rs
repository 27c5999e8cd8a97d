//! Self-correcting RAG control loop
//!
//! A finite-state machine over [`LoopStep`]: retrieve, grade chunks, generate,
//! grade the answer, and rewrite the question when either check fails, with
//! independent bounds on retrieval and generation attempts.

mod config;
mod error;
mod executor;
mod state;
mod transition;

pub use config::CorrectionConfig;
pub use error::{Collaborator, CorrectionError};
pub use executor::{CorrectionLoop, RunResult};
pub use state::{
    AnswerConfidence, BestAnswer, LoopState, LoopStep, Outcome, Termination, TraceEntry,
};
pub use transition::{finish_exhausted, is_stagnant, transition};
