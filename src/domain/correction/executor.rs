//! Correction loop executor
//!
//! Drives [`LoopState`] through the steps of the loop: each step's collaborator
//! call runs in [`CorrectionLoop::execute`], then the pure [`transition`] picks
//! the next step.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::config::CorrectionConfig;
use super::error::{Collaborator, CorrectionError};
use super::state::{
    AnswerConfidence, LoopState, LoopStep, Outcome, Termination, TraceEntry,
};
use super::transition::{finish_exhausted, transition};
use crate::domain::grading::{
    AnswerGenerator, AnswerGrader, AnswerVerdict, GradedChunk, Generation, QueryRewriter,
    RelevanceGrader, RewriteContext, RewriteReason,
};
use crate::domain::retrieval::{DocumentChunk, Retriever};

/// Result of one correction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub answer: String,
    pub original_question: String,
    /// Query in effect when the run stopped
    pub final_query: String,
    pub termination: Termination,
    pub confidence: AnswerConfidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<AnswerVerdict>,
    pub retrieval_attempts: u32,
    pub generation_attempts: u32,
    /// Reason of each rewrite requested during the run
    pub rewrite_reasons: Vec<RewriteReason>,
    /// Sources of the chunks the answer was generated from
    pub sources: Vec<String>,
    pub trace: Vec<TraceEntry>,
    pub duration_ms: u64,
}

impl RunResult {
    fn from_state(run_id: Uuid, state: LoopState, duration_ms: u64) -> Self {
        let outcome = state
            .outcome
            .clone()
            .unwrap_or_else(|| Outcome::insufficient_information(Termination::InsufficientInformation));

        Self {
            run_id,
            confidence: outcome.confidence(),
            answer: outcome.answer,
            termination: outcome.termination,
            verdict: outcome.verdict,
            sources: outcome.sources,
            original_question: state.original_question.clone(),
            final_query: state.query.clone(),
            retrieval_attempts: state.retrieval_attempts,
            generation_attempts: state.generation_attempts,
            rewrite_reasons: state.rewrite_reasons.clone(),
            trace: state.into_trace(),
            duration_ms,
        }
    }

    /// Step names in trace order
    pub fn steps(&self) -> Vec<LoopStep> {
        self.trace.iter().map(|entry| entry.step).collect()
    }

    /// Number of rewrites performed
    pub fn rewrites(&self) -> usize {
        self.trace
            .iter()
            .filter(|e| {
                matches!(
                    e.step,
                    LoopStep::RewriteForRetrieval | LoopStep::RewriteForGeneration
                )
            })
            .count()
    }
}

/// Self-correcting retrieval-augmented answering loop
///
/// Collaborators are shared and stateless; every call to [`run`](Self::run)
/// owns its own [`LoopState`], so one loop can serve many questions concurrently.
#[derive(Debug, Clone)]
pub struct CorrectionLoop {
    retriever: Arc<dyn Retriever>,
    relevance_grader: Arc<dyn RelevanceGrader>,
    generator: Arc<dyn AnswerGenerator>,
    answer_grader: Arc<dyn AnswerGrader>,
    rewriter: Arc<dyn QueryRewriter>,
    config: CorrectionConfig,
}

impl CorrectionLoop {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        relevance_grader: Arc<dyn RelevanceGrader>,
        generator: Arc<dyn AnswerGenerator>,
        answer_grader: Arc<dyn AnswerGrader>,
        rewriter: Arc<dyn QueryRewriter>,
    ) -> Self {
        Self {
            retriever,
            relevance_grader,
            generator,
            answer_grader,
            rewriter,
            config: CorrectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CorrectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Answer a question, correcting retrieval and generation as needed
    pub async fn run(&self, original_question: &str) -> Result<RunResult, CorrectionError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("correction_loop", %run_id);

        self.run_inner(run_id, original_question)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        original_question: &str,
    ) -> Result<RunResult, CorrectionError> {
        let question = original_question.trim();
        if question.is_empty() {
            return Err(CorrectionError::InvalidQuestion);
        }

        let started = Instant::now();
        let limit = self.config.transition_limit();
        let mut state = LoopState::new(question);
        let mut step = LoopStep::Retrieve;
        let mut transitions = 0usize;

        info!(question = %question, "Starting correction run");

        while step != LoopStep::Done {
            state = self.execute(step, state).await?;

            let (next, next_state) = transition(step, state, &self.config);
            state = next_state;
            transitions += 1;

            debug!(from = %step, to = %next, transitions, "Transition");
            step = next;

            if step != LoopStep::Done && transitions >= limit {
                warn!(transitions, "Transition limit reached, stopping run");
                let (done, finished) = finish_exhausted(state);
                step = done;
                state = finished;
            }
        }

        let (termination, status) = match state.outcome.as_ref() {
            Some(outcome) => (outcome.termination, outcome.termination.describe()),
            None => (
                Termination::InsufficientInformation,
                Termination::InsufficientInformation.describe(),
            ),
        };
        state.record(LoopStep::Done, status);

        if termination == Termination::Accepted {
            info!(termination = termination.as_str(), "Correction run finished");
        } else {
            warn!(
                termination = termination.as_str(),
                retrieval_attempts = state.retrieval_attempts,
                generation_attempts = state.generation_attempts,
                "Correction run degraded"
            );
        }

        Ok(RunResult::from_state(
            run_id,
            state,
            started.elapsed().as_millis() as u64,
        ))
    }

    /// Perform the collaborator call for `step` and record it in the trace
    pub async fn execute(
        &self,
        step: LoopStep,
        mut state: LoopState,
    ) -> Result<LoopState, CorrectionError> {
        match step {
            LoopStep::Retrieve => {
                debug!(
                    step = %step,
                    retrieval_attempt = state.retrieval_attempts,
                    query = %state.query,
                    "Retrieving"
                );

                let chunks = self
                    .retriever
                    .retrieve(&state.query)
                    .await
                    .map_err(|e| CorrectionError::unavailable(Collaborator::Retriever, step, e))?;

                let status = format!(
                    "Retrieved {} chunk(s) (attempt {}/{})",
                    chunks.len(),
                    state.retrieval_attempts,
                    self.config.retrieval_limit()
                );
                state.retrieved = chunks;
                state.graded.clear();
                state.record(step, status);
            }

            LoopStep::GradeDocuments => {
                let graded = self.grade_chunks(&state.query, &state.retrieved).await?;
                let relevant = graded
                    .iter()
                    .filter(|g| g.is_relevant(self.config.include_ambiguous))
                    .count();

                info!(step = %step, relevant, total = graded.len(), "Graded chunks");

                state.graded = graded;
                let status = format!("{} of {} chunk(s) relevant", relevant, state.graded.len());
                state.record(step, status);
            }

            LoopStep::RewriteForRetrieval | LoopStep::RewriteForGeneration => {
                let reason = state.pending_rewrite.unwrap_or(match step {
                    LoopStep::RewriteForRetrieval => RewriteReason::NoRelevantDocuments,
                    _ => RewriteReason::OffTopic,
                });
                let context = RewriteContext::new(reason, state.rewrites() + 1);

                let rewritten = self
                    .rewriter
                    .rewrite(&state.original_question, &context)
                    .await
                    .map_err(|e| CorrectionError::unavailable(Collaborator::Rewriter, step, e))?;

                info!(
                    step = %step,
                    reason = reason.as_str(),
                    retrieval_attempt = state.retrieval_attempts,
                    generation_attempt = state.generation_attempts,
                    query = %rewritten,
                    "Rewrote question"
                );

                state.record(
                    step,
                    format!("Rewrote question ({}): {}", reason.as_str(), rewritten.trim()),
                );
                state.rewrite_reasons.push(reason);
                state.rewritten = Some(rewritten);
            }

            LoopStep::Generate => {
                debug!(
                    step = %step,
                    generation_attempt = state.generation_attempts,
                    chunks = state.context.len(),
                    "Generating"
                );

                let generation = self
                    .generator
                    .generate(&state.query, &state.context)
                    .await
                    .map_err(|e| CorrectionError::unavailable(Collaborator::Generator, step, e))?;

                let status = match generation {
                    Generation::Answer(_) => format!(
                        "Generated answer from {} chunk(s) (attempt {}/{})",
                        state.context.len(),
                        state.generation_attempts,
                        self.config.generation_limit()
                    ),
                    Generation::CannotAnswer => "Declined: no context to answer from".to_string(),
                };
                state.candidate = Some(generation);
                state.verdict = None;
                state.record(step, status);
            }

            LoopStep::GradeAnswer => {
                let verdict = match state.candidate.as_ref() {
                    Some(Generation::Answer(answer)) => self
                        .answer_grader
                        .grade(&state.original_question, &state.context, answer)
                        .await
                        .map_err(|e| {
                            CorrectionError::unavailable(Collaborator::AnswerGrader, step, e)
                        })?,
                    _ => AnswerVerdict::new(false, false).with_rationale("No answer to grade"),
                };

                info!(
                    step = %step,
                    grounded = verdict.grounded,
                    relevant = verdict.relevant,
                    generation_attempt = state.generation_attempts,
                    "Graded answer"
                );

                state.record(
                    step,
                    format!(
                        "grounded={}, relevant={}",
                        verdict.grounded, verdict.relevant
                    ),
                );
                state.verdict = Some(verdict);
            }

            LoopStep::Done => {}
        }

        Ok(state)
    }

    /// Grade every chunk independently, at most `grading_concurrency` at a time
    async fn grade_chunks(
        &self,
        query: &str,
        chunks: &[DocumentChunk],
    ) -> Result<Vec<GradedChunk>, CorrectionError> {
        // Each grading future owns its inputs so the run future stays Send
        let results: Vec<_> = stream::iter(chunks.to_vec())
            .map(|chunk| {
                let grader = self.relevance_grader.clone();
                let query = query.to_string();
                async move { grader.grade(&query, &chunk).await }
            })
            .buffered(self.config.concurrency())
            .collect()
            .await;

        results.into_iter().collect::<Result<Vec<_>, _>>().map_err(|e| {
            CorrectionError::unavailable(Collaborator::RelevanceGrader, LoopStep::GradeDocuments, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grading::{
        INSUFFICIENT_INFORMATION_ANSWER, MockAnswerGenerator, MockAnswerGrader,
        MockQueryRewriter, MockRelevanceGrader,
    };
    use crate::domain::retrieval::MockRetriever;

    fn paris_chunk() -> DocumentChunk {
        DocumentChunk::new("c1", "Paris is the capital of France.", "geo.pdf").with_score(0.91)
    }

    fn noise_chunk(id: &str) -> DocumentChunk {
        DocumentChunk::new(id, "Photosynthesis converts sunlight into sugar.", "bio.pdf")
            .with_score(0.3)
    }

    struct Fixture {
        retriever: Arc<MockRetriever>,
        relevance: Arc<MockRelevanceGrader>,
        generator: Arc<MockAnswerGenerator>,
        grader: Arc<MockAnswerGrader>,
        rewriter: Arc<MockQueryRewriter>,
    }

    impl Fixture {
        fn new(
            retriever: MockRetriever,
            relevance: MockRelevanceGrader,
            generator: MockAnswerGenerator,
            grader: MockAnswerGrader,
            rewriter: MockQueryRewriter,
        ) -> Self {
            Self {
                retriever: Arc::new(retriever),
                relevance: Arc::new(relevance),
                generator: Arc::new(generator),
                grader: Arc::new(grader),
                rewriter: Arc::new(rewriter),
            }
        }

        fn paris() -> Self {
            Self::new(
                MockRetriever::new().with_chunks(vec![paris_chunk()]),
                MockRelevanceGrader::new().relevant_when("Paris"),
                MockAnswerGenerator::new().with_answer("Paris."),
                MockAnswerGrader::new(true, true),
                MockQueryRewriter::new(),
            )
        }

        fn correction_loop(&self, config: CorrectionConfig) -> CorrectionLoop {
            CorrectionLoop::new(
                self.retriever.clone(),
                self.relevance.clone(),
                self.generator.clone(),
                self.grader.clone(),
                self.rewriter.clone(),
            )
            .with_config(config)
        }
    }

    fn count(result: &RunResult, step: LoopStep) -> usize {
        result.steps().iter().filter(|s| **s == step).count()
    }

    #[tokio::test]
    async fn test_capital_of_france_happy_path() {
        let fixture = Fixture::paris();
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(
            result.steps(),
            vec![
                LoopStep::Retrieve,
                LoopStep::GradeDocuments,
                LoopStep::Generate,
                LoopStep::GradeAnswer,
                LoopStep::Done,
            ]
        );
        assert_eq!(result.answer, "Paris.");
        assert_eq!(result.termination, Termination::Accepted);
        assert_eq!(result.confidence, AnswerConfidence::High);
        assert_eq!(result.rewrites(), 0);
        assert_eq!(fixture.rewriter.call_count(), 0);
        assert_eq!(result.sources, vec!["geo.pdf"]);
        assert_eq!(result.final_query, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_always_empty_retrieval_returns_sentinel() {
        let fixture = Fixture::new(
            MockRetriever::new(),
            MockRelevanceGrader::new().all_relevant(),
            MockAnswerGenerator::new().with_answer("made up"),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::new(),
        );
        let config = CorrectionConfig::default();
        let correction = fixture.correction_loop(config.clone());

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(result.answer, INSUFFICIENT_INFORMATION_ANSWER);
        assert_eq!(result.termination, Termination::InsufficientInformation);
        assert_eq!(result.confidence, AnswerConfidence::None);
        assert_eq!(
            count(&result, LoopStep::Retrieve),
            config.max_retrieval_attempts as usize
        );
        assert_eq!(result.retrieval_attempts, config.max_retrieval_attempts);
        assert_eq!(fixture.generator.call_count(), 0);
        assert_eq!(result.steps().last(), Some(&LoopStep::Done));
    }

    #[tokio::test]
    async fn test_never_grounded_returns_last_answer_low_confidence() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![paris_chunk()]),
            MockRelevanceGrader::new().all_relevant(),
            MockAnswerGenerator::new().with_answers(vec!["first", "second", "third"]),
            MockAnswerGrader::new(false, true),
            MockQueryRewriter::new(),
        );
        let config = CorrectionConfig::default();
        let correction = fixture.correction_loop(config.clone());

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(
            count(&result, LoopStep::Generate),
            config.max_generation_attempts as usize
        );
        assert_eq!(fixture.generator.call_count(), 3);
        assert_eq!(result.answer, "third");
        assert_eq!(result.termination, Termination::LowConfidence);
        assert_eq!(result.confidence, AnswerConfidence::Low);
        assert_eq!(result.generation_attempts, 3);
    }

    #[tokio::test]
    async fn test_grounded_but_off_topic_returns_best_effort() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![paris_chunk()]),
            MockRelevanceGrader::new().all_relevant(),
            MockAnswerGenerator::new().with_answers(vec!["grounded", "ungrounded"]),
            MockAnswerGrader::with_sequence(vec![(true, false), (false, true)]),
            MockQueryRewriter::new(),
        );
        let correction =
            fixture.correction_loop(CorrectionConfig::new().with_max_generation_attempts(2));

        let result = correction.run("q").await.unwrap();

        assert_eq!(result.answer, "grounded");
        assert_eq!(result.termination, Termination::BestEffort);
        assert_eq!(result.confidence, AnswerConfidence::BestEffort);
    }

    #[tokio::test]
    async fn test_recovers_after_retrieval_rewrite() {
        let fixture = Fixture::new(
            MockRetriever::new().with_sequence(vec![vec![noise_chunk("n1")], vec![paris_chunk()]]),
            MockRelevanceGrader::new().relevant_when("Paris"),
            MockAnswerGenerator::new().with_answer("Paris."),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::fixed("Which city is the capital of France?"),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(
            result.steps(),
            vec![
                LoopStep::Retrieve,
                LoopStep::GradeDocuments,
                LoopStep::RewriteForRetrieval,
                LoopStep::Retrieve,
                LoopStep::GradeDocuments,
                LoopStep::Generate,
                LoopStep::GradeAnswer,
                LoopStep::Done,
            ]
        );
        assert_eq!(result.final_query, "Which city is the capital of France?");
        assert_eq!(
            fixture.retriever.queries(),
            vec![
                "What is the capital of France?",
                "Which city is the capital of France?"
            ]
        );
        assert_eq!(result.retrieval_attempts, 2);
        assert_eq!(result.termination, Termination::Accepted);
    }

    #[tokio::test]
    async fn test_generation_rewrite_triggers_full_reretrieval() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![paris_chunk()]),
            MockRelevanceGrader::new().all_relevant(),
            MockAnswerGenerator::new().with_answers(vec!["Lyon.", "Paris."]),
            MockAnswerGrader::with_sequence(vec![(false, true), (true, true)]),
            MockQueryRewriter::new(),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(result.answer, "Paris.");
        assert_eq!(fixture.retriever.call_count(), 2);
        assert_eq!(count(&result, LoopStep::RewriteForGeneration), 1);
        assert_eq!(fixture.rewriter.calls()[0].1.reason, RewriteReason::Ungrounded);
        assert_eq!(result.generation_attempts, 2);
        assert_eq!(result.retrieval_attempts, 1);
    }

    #[tokio::test]
    async fn test_rewrites_always_start_from_original_question() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![noise_chunk("n1")]),
            MockRelevanceGrader::new(),
            MockAnswerGenerator::new().with_answer("unsure"),
            MockAnswerGrader::new(false, false),
            MockQueryRewriter::new(),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        correction.run("What is the capital of France?").await.unwrap();

        let calls = fixture.rewriter.calls();
        assert!(calls.len() >= 2);
        for (input, _) in &calls {
            assert_eq!(input, "What is the capital of France?");
        }
        let attempts: Vec<u32> = calls.iter().map(|(_, ctx)| ctx.attempt).collect();
        assert_eq!(attempts, (1..=calls.len() as u32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_rewriter_input_independent_of_failure_history() {
        // Two runs with different retrieval histories reach the same rewrite context
        let first = Fixture::new(
            MockRetriever::new().with_chunks(vec![noise_chunk("n1")]),
            MockRelevanceGrader::new(),
            MockAnswerGenerator::new(),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::fixed("rewritten"),
        );
        let second = Fixture::new(
            MockRetriever::new().with_chunks(vec![noise_chunk("n2"), noise_chunk("n3")]),
            MockRelevanceGrader::new(),
            MockAnswerGenerator::new(),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::fixed("rewritten"),
        );
        let config = CorrectionConfig::new().with_max_retrieval_attempts(2);

        first.correction_loop(config.clone()).run("Where is Paris?").await.unwrap();
        second.correction_loop(config).run("Where is Paris?").await.unwrap();

        assert_eq!(first.rewriter.calls(), second.rewriter.calls());
    }

    #[tokio::test]
    async fn test_degraded_generation_uses_all_retrieved_chunks() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![noise_chunk("n1"), noise_chunk("n2")]),
            MockRelevanceGrader::new(),
            MockAnswerGenerator::new().with_answer("best guess"),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::new(),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("q").await.unwrap();

        assert_eq!(count(&result, LoopStep::RewriteForRetrieval), 2);
        assert_eq!(fixture.generator.calls()[0].1, vec!["n1", "n2"]);
        assert_eq!(result.answer, "best guess");
    }

    #[tokio::test]
    async fn test_exhausted_retrieval_keeps_partial_relevant_context() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![paris_chunk(), noise_chunk("n1")]),
            MockRelevanceGrader::new().relevant_when("Paris"),
            MockAnswerGenerator::new().with_answer("Paris."),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::new(),
        );
        let config = CorrectionConfig::new()
            .with_min_relevant_chunks(2)
            .with_max_retrieval_attempts(1);
        let correction = fixture.correction_loop(config);

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(count(&result, LoopStep::RewriteForRetrieval), 0);
        assert_eq!(fixture.generator.calls()[0].1, vec!["c1"]);
        assert_eq!(result.sources, vec!["geo.pdf"]);
    }

    #[tokio::test]
    async fn test_min_relevant_chunks_triggers_rewrite() {
        let fixture = Fixture::new(
            MockRetriever::new().with_sequence(vec![
                vec![paris_chunk(), noise_chunk("n1")],
                vec![paris_chunk(), DocumentChunk::new("c2", "Paris hosts the Louvre.", "art.pdf")],
            ]),
            MockRelevanceGrader::new().relevant_when("Paris"),
            MockAnswerGenerator::new().with_answer("Paris."),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::new(),
        );
        let correction = fixture.correction_loop(CorrectionConfig::new().with_min_relevant_chunks(2));

        let result = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(count(&result, LoopStep::RewriteForRetrieval), 1);
        assert_eq!(fixture.generator.calls()[0].1, vec!["c1", "c2"]);
        assert_eq!(result.termination, Termination::Accepted);
    }

    #[tokio::test]
    async fn test_identical_rewrite_stops_the_run() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![noise_chunk("n1")]),
            MockRelevanceGrader::new(),
            MockAnswerGenerator::new(),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::identity(),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("q").await.unwrap();

        assert_eq!(result.termination, Termination::RewriteStagnation);
        assert_eq!(result.answer, INSUFFICIENT_INFORMATION_ANSWER);
        assert_eq!(fixture.rewriter.call_count(), 1);
        assert_eq!(fixture.retriever.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stagnation_returns_best_answer_so_far() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![paris_chunk()]),
            MockRelevanceGrader::new().all_relevant(),
            MockAnswerGenerator::new().with_answer("Paris, probably."),
            MockAnswerGrader::new(true, false),
            MockQueryRewriter::identity(),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("q").await.unwrap();

        assert_eq!(result.termination, Termination::RewriteStagnation);
        assert_eq!(result.answer, "Paris, probably.");
        assert_eq!(result.confidence, AnswerConfidence::BestEffort);
    }

    #[tokio::test]
    async fn test_terminates_within_transition_bound() {
        for (max_r, max_g) in [(1, 1), (2, 3), (3, 3), (5, 2)] {
            let fixture = Fixture::new(
                MockRetriever::new().with_sequence(vec![
                    vec![noise_chunk("n1")],
                    vec![noise_chunk("n2")],
                    vec![paris_chunk()],
                ]),
                MockRelevanceGrader::new().relevant_when("Paris"),
                MockAnswerGenerator::new(),
                MockAnswerGrader::new(false, false),
                MockQueryRewriter::new(),
            );
            let config = CorrectionConfig::new()
                .with_max_retrieval_attempts(max_r)
                .with_max_generation_attempts(max_g);
            let correction = fixture.correction_loop(config.clone());

            let result = correction.run("q").await.unwrap();

            // One trace entry per executed step plus DONE
            assert!(result.trace.len() <= config.transition_limit() + 1);
            assert!(result.retrieval_attempts <= max_r);
            assert!(result.generation_attempts <= max_g);
            assert_eq!(result.steps().last(), Some(&LoopStep::Done));
        }
    }

    #[tokio::test]
    async fn test_idempotent_with_deterministic_collaborators() {
        let run = || async {
            let fixture = Fixture::new(
                MockRetriever::new().with_chunks(vec![noise_chunk("n1"), paris_chunk()]),
                MockRelevanceGrader::new().relevant_when("Paris"),
                MockAnswerGenerator::new().with_answer("Paris."),
                MockAnswerGrader::with_sequence(vec![(true, false), (true, true)]),
                MockQueryRewriter::new(),
            );
            fixture
                .correction_loop(CorrectionConfig::default())
                .run("What is the capital of France?")
                .await
                .unwrap()
        };

        let first = run().await;
        let second = run().await;

        assert_eq!(first.steps(), second.steps());
        assert_eq!(first.answer, second.answer);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_same_loop_is_idempotent_across_runs() {
        let fixture = Fixture::paris();
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let first = correction.run("What is the capital of France?").await.unwrap();
        let second = correction.run("What is the capital of France?").await.unwrap();

        assert_eq!(first.steps(), second.steps());
        assert_eq!(first.answer, second.answer);
    }

    #[tokio::test]
    async fn test_answer_graded_against_original_question() {
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(vec![paris_chunk()]),
            MockRelevanceGrader::new().all_relevant(),
            MockAnswerGenerator::new().with_answer("Paris."),
            MockAnswerGrader::with_sequence(vec![(true, false), (true, true)]),
            MockQueryRewriter::fixed("capital city France"),
        );
        let correction = fixture.correction_loop(CorrectionConfig::default());

        correction.run("What is the capital of France?").await.unwrap();

        for (question, _) in fixture.grader.calls() {
            assert_eq!(question, "What is the capital of France?");
        }
        assert_eq!(fixture.generator.calls()[1].0, "capital city France");
    }

    #[tokio::test]
    async fn test_chunks_graded_independently_in_order() {
        let chunks: Vec<_> = (0..10)
            .map(|i| {
                if i % 3 == 0 {
                    paris_chunk().with_metadata("i", serde_json::json!(i))
                } else {
                    noise_chunk(&format!("n{}", i))
                }
            })
            .collect();
        let fixture = Fixture::new(
            MockRetriever::new().with_chunks(chunks),
            MockRelevanceGrader::new().relevant_when("Paris"),
            MockAnswerGenerator::new().with_answer("Paris."),
            MockAnswerGrader::new(true, true),
            MockQueryRewriter::new(),
        );
        let correction =
            fixture.correction_loop(CorrectionConfig::new().with_grading_concurrency(3));

        let result = correction.run("q").await.unwrap();

        assert_eq!(fixture.relevance.calls().len(), 10);
        assert_eq!(fixture.generator.calls()[0].1.len(), 4);
        assert_eq!(result.termination, Termination::Accepted);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let fixture = Fixture::paris();
        let correction = fixture.correction_loop(CorrectionConfig::default());

        let result = correction.run("   ").await;

        assert!(matches!(result, Err(CorrectionError::InvalidQuestion)));
        assert_eq!(fixture.retriever.call_count(), 0);
    }

    #[tokio::test]
    async fn test_collaborator_errors_surface_as_unavailable() {
        let cases = [
            (
                Fixture::new(
                    MockRetriever::new().with_error("index offline"),
                    MockRelevanceGrader::new().all_relevant(),
                    MockAnswerGenerator::new(),
                    MockAnswerGrader::new(true, true),
                    MockQueryRewriter::new(),
                ),
                Collaborator::Retriever,
            ),
            (
                Fixture::new(
                    MockRetriever::new().with_chunks(vec![paris_chunk()]),
                    MockRelevanceGrader::new().with_error("model down"),
                    MockAnswerGenerator::new(),
                    MockAnswerGrader::new(true, true),
                    MockQueryRewriter::new(),
                ),
                Collaborator::RelevanceGrader,
            ),
            (
                Fixture::new(
                    MockRetriever::new().with_chunks(vec![paris_chunk()]),
                    MockRelevanceGrader::new().all_relevant(),
                    MockAnswerGenerator::new().with_error("model down"),
                    MockAnswerGrader::new(true, true),
                    MockQueryRewriter::new(),
                ),
                Collaborator::Generator,
            ),
            (
                Fixture::new(
                    MockRetriever::new().with_chunks(vec![paris_chunk()]),
                    MockRelevanceGrader::new().all_relevant(),
                    MockAnswerGenerator::new(),
                    MockAnswerGrader::new(true, true).with_error("model down"),
                    MockQueryRewriter::new(),
                ),
                Collaborator::AnswerGrader,
            ),
            (
                Fixture::new(
                    MockRetriever::new().with_chunks(vec![noise_chunk("n1")]),
                    MockRelevanceGrader::new(),
                    MockAnswerGenerator::new(),
                    MockAnswerGrader::new(true, true),
                    MockQueryRewriter::new().with_error("model down"),
                ),
                Collaborator::Rewriter,
            ),
        ];

        for (fixture, expected) in cases {
            let err = fixture
                .correction_loop(CorrectionConfig::default())
                .run("q")
                .await
                .unwrap_err();

            assert_eq!(err.collaborator(), Some(expected));
        }
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_run_future_is_send() {
        let fixture = Fixture::paris();
        let correction = fixture.correction_loop(CorrectionConfig::default());

        assert_send(correction.run("q"));
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_share_state() {
        let fixture = Fixture::paris();
        let correction = Arc::new(fixture.correction_loop(CorrectionConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let correction = correction.clone();
                tokio::spawn(async move { correction.run(&format!("question {}", i)).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.original_question, format!("question {}", i));
            assert_eq!(result.steps().len(), 5);
        }
    }
}
