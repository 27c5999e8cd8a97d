//! Pure transition function of the correction loop
//!
//! Collaborator calls happen in the executor; this module only reads their
//! results from [`LoopState`] and decides the next step.

use super::config::CorrectionConfig;
use super::state::{LoopState, LoopStep, Outcome, Termination};
use crate::domain::grading::{AnswerVerdict, Generation, RewriteReason};

/// Decide the step after `step` has executed
pub fn transition(
    step: LoopStep,
    mut state: LoopState,
    config: &CorrectionConfig,
) -> (LoopStep, LoopState) {
    match step {
        LoopStep::Retrieve => {
            if state.retrieved.is_empty() && state.retrieval_attempts >= config.retrieval_limit() {
                return finish_exhausted(state);
            }
            (LoopStep::GradeDocuments, state)
        }

        LoopStep::GradeDocuments => {
            let relevant = state.relevant_chunks(config.include_ambiguous);

            if !relevant.is_empty() && relevant.len() >= config.min_relevant_chunks {
                state.context = relevant;
                (LoopStep::Generate, state)
            } else if state.retrieval_attempts < config.retrieval_limit() {
                state.pending_rewrite = Some(RewriteReason::NoRelevantDocuments);
                (LoopStep::RewriteForRetrieval, state)
            } else {
                // Out of retries: prefer the relevant subset, else whatever was retrieved
                state.context = if relevant.is_empty() {
                    state.retrieved.clone()
                } else {
                    relevant
                };
                (LoopStep::Generate, state)
            }
        }

        LoopStep::RewriteForRetrieval | LoopStep::RewriteForGeneration => {
            let rewritten = state.rewritten.take().unwrap_or_default();

            if is_stagnant(&rewritten, &state.original_question) {
                return finish(state, Termination::RewriteStagnation);
            }

            if step == LoopStep::RewriteForRetrieval {
                state.retrieval_attempts += 1;
            } else {
                state.generation_attempts += 1;
            }
            state.query = rewritten.trim().to_string();
            state.reset_iteration();

            (LoopStep::Retrieve, state)
        }

        LoopStep::Generate => (LoopStep::GradeAnswer, state),

        LoopStep::GradeAnswer => {
            let verdict = state
                .verdict
                .clone()
                .unwrap_or_else(|| AnswerVerdict::new(false, false));

            if let Some(Generation::Answer(answer)) = state.candidate.clone() {
                state.offer_best(&answer, &verdict);

                if verdict.is_accepted() {
                    return finish(state, Termination::Accepted);
                }
            }

            if state.generation_attempts < config.generation_limit() {
                state.pending_rewrite = Some(if verdict.grounded {
                    RewriteReason::OffTopic
                } else {
                    RewriteReason::Ungrounded
                });
                (LoopStep::RewriteForGeneration, state)
            } else {
                finish_exhausted(state)
            }
        }

        LoopStep::Done => (LoopStep::Done, state),
    }
}

/// A rewrite that is empty or equal to the original question cannot make progress
pub fn is_stagnant(rewritten: &str, original_question: &str) -> bool {
    let rewritten = rewritten.trim();
    rewritten.is_empty() || rewritten == original_question.trim()
}

/// Terminate with the best answer so far, or the insufficient-information answer
pub fn finish_exhausted(state: LoopState) -> (LoopStep, LoopState) {
    let termination = match state.best.as_ref() {
        Some(best) if best.verdict.is_accepted() => Termination::Accepted,
        Some(best) if best.verdict.grounded => Termination::BestEffort,
        Some(_) => Termination::LowConfidence,
        None => Termination::InsufficientInformation,
    };
    finish(state, termination)
}

fn finish(mut state: LoopState, termination: Termination) -> (LoopStep, LoopState) {
    let outcome = match state.best.clone() {
        Some(best) => Outcome::from_best(termination, best),
        None => Outcome::insufficient_information(termination),
    };
    state.outcome = Some(outcome);
    (LoopStep::Done, state)
}
