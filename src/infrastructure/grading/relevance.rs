//! Relevance graders: LLM judge, similarity thresholds, hybrid, keyword overlap

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::complete;
use crate::domain::DomainError;
use crate::domain::grading::prompts::{self, RELEVANCE_SYSTEM, RELEVANCE_USER};
use crate::domain::grading::{
    GradedChunk, RelevanceGrader, RelevanceStrategy, RelevanceThresholds, RelevanceVerdict,
};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::retrieval::DocumentChunk;

/// Asks a model for a yes/no relevance judgement
#[derive(Debug, Clone)]
pub struct LlmRelevanceGrader {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl LlmRelevanceGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl RelevanceGrader for LlmRelevanceGrader {
    async fn grade(&self, query: &str, chunk: &DocumentChunk) -> Result<GradedChunk, DomainError> {
        let request = LlmRequest::builder()
            .system(RELEVANCE_SYSTEM)
            .user(prompts::render(
                RELEVANCE_USER,
                &[("document", &chunk.content), ("question", query)],
            ))
            .temperature(self.temperature)
            .max_tokens(150)
            .build();

        let reply = complete(&self.provider, &self.model, request).await?;
        let score = prompts::parse_binary_score(&reply);

        debug!(chunk_id = %chunk.id, relevant = score.yes, "LLM relevance judgement");

        let graded = GradedChunk::new(chunk.clone(), RelevanceVerdict::from_bool(score.yes));
        Ok(match score.reason {
            Some(reason) => graded.with_rationale(reason),
            None => graded,
        })
    }

    fn grader_name(&self) -> &'static str {
        "llm"
    }
}

/// Classifies chunks by their retrieval similarity score alone
#[derive(Debug, Clone, Default)]
pub struct ThresholdRelevanceGrader {
    thresholds: RelevanceThresholds,
}

impl ThresholdRelevanceGrader {
    pub fn new(thresholds: RelevanceThresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait]
impl RelevanceGrader for ThresholdRelevanceGrader {
    async fn grade(&self, _query: &str, chunk: &DocumentChunk) -> Result<GradedChunk, DomainError> {
        let verdict = self.thresholds.classify(chunk.score);

        Ok(GradedChunk::new(chunk.clone(), verdict)
            .with_rationale(format!("similarity {:.3}", chunk.score)))
    }

    fn grader_name(&self) -> &'static str {
        "threshold"
    }
}

/// Thresholds decide clear cases; the model breaks ties on ambiguous chunks
#[derive(Debug, Clone)]
pub struct HybridRelevanceGrader {
    thresholds: ThresholdRelevanceGrader,
    judge: LlmRelevanceGrader,
}

impl HybridRelevanceGrader {
    pub fn new(thresholds: RelevanceThresholds, judge: LlmRelevanceGrader) -> Self {
        Self {
            thresholds: ThresholdRelevanceGrader::new(thresholds),
            judge,
        }
    }
}

#[async_trait]
impl RelevanceGrader for HybridRelevanceGrader {
    async fn grade(&self, query: &str, chunk: &DocumentChunk) -> Result<GradedChunk, DomainError> {
        let graded = self.thresholds.grade(query, chunk).await?;

        if graded.verdict == RelevanceVerdict::Ambiguous {
            return self.judge.grade(query, chunk).await;
        }

        Ok(graded)
    }

    fn grader_name(&self) -> &'static str {
        "hybrid"
    }
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "what", "which", "who", "whom", "whose", "when",
    "where", "why", "how", "does", "did", "with", "from", "that", "this", "these", "those", "into",
    "about", "is", "of", "in", "on", "to", "a", "an", "it", "its", "be", "by", "or", "as", "at",
    "can", "you", "tell", "me", "please", "there",
];

/// Deterministic grader: relevant when the chunk shares a keyword with the query
#[derive(Debug, Clone, Default)]
pub struct KeywordRelevanceGrader;

impl KeywordRelevanceGrader {
    pub fn new() -> Self {
        Self
    }

    fn keywords(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 2)
            .map(str::to_lowercase)
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
            .collect()
    }
}

#[async_trait]
impl RelevanceGrader for KeywordRelevanceGrader {
    async fn grade(&self, query: &str, chunk: &DocumentChunk) -> Result<GradedChunk, DomainError> {
        let wanted = Self::keywords(query);
        if wanted.is_empty() {
            return Ok(GradedChunk::new(chunk.clone(), RelevanceVerdict::Ambiguous)
                .with_rationale("query has no keywords"));
        }

        let present = Self::keywords(&chunk.content);
        let mut matched: Vec<&String> = wanted.intersection(&present).collect();
        matched.sort();

        let graded = GradedChunk::new(chunk.clone(), RelevanceVerdict::from_bool(!matched.is_empty()));
        Ok(if matched.is_empty() {
            graded.with_rationale("no shared keywords")
        } else {
            let list: Vec<&str> = matched.iter().map(|s| s.as_str()).collect();
            graded.with_rationale(format!("shared keywords: {}", list.join(", ")))
        })
    }

    fn grader_name(&self) -> &'static str {
        "keyword"
    }
}

/// Build the grader for a configured strategy
pub fn relevance_grader_for(
    strategy: RelevanceStrategy,
    thresholds: RelevanceThresholds,
    provider: Arc<dyn LlmProvider>,
    model: &str,
) -> Arc<dyn RelevanceGrader> {
    match strategy {
        RelevanceStrategy::Llm => Arc::new(LlmRelevanceGrader::new(provider, model)),
        RelevanceStrategy::Threshold => Arc::new(ThresholdRelevanceGrader::new(thresholds)),
        RelevanceStrategy::Hybrid => Arc::new(HybridRelevanceGrader::new(
            thresholds,
            LlmRelevanceGrader::new(provider, model),
        )),
        RelevanceStrategy::Keyword => Arc::new(KeywordRelevanceGrader::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    fn chunk(content: &str, score: f32) -> DocumentChunk {
        DocumentChunk::new("c1", content, "geo.pdf").with_score(score)
    }

    #[tokio::test]
    async fn test_llm_grader_json_reply() {
        let provider = Arc::new(
            MockLlmProvider::new("mock")
                .with_reply_when("Paris", r#"{"score": "yes", "reason": "names the capital"}"#)
                .with_reply(r#"{"score": "no"}"#),
        );
        let grader = LlmRelevanceGrader::new(provider.clone(), "gpt-4");

        let relevant = grader
            .grade("What is the capital of France?", &chunk("Paris is the capital of France.", 0.3))
            .await
            .unwrap();
        let irrelevant = grader
            .grade("What is the capital of France?", &chunk("Photosynthesis uses light.", 0.3))
            .await
            .unwrap();

        assert_eq!(relevant.verdict, RelevanceVerdict::Relevant);
        assert_eq!(relevant.rationale.as_deref(), Some("names the capital"));
        assert_eq!(irrelevant.verdict, RelevanceVerdict::Irrelevant);

        let (model, request) = &provider.requests()[0];
        assert_eq!(model, "gpt-4");
        assert!(request.full_text().contains("What is the capital of France?"));
        assert_eq!(request.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_llm_grader_relaxed_reply() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply("Yes."));
        let grader = LlmRelevanceGrader::new(provider, "mistral");

        let graded = grader.grade("q", &chunk("anything", 0.0)).await.unwrap();

        assert_eq!(graded.verdict, RelevanceVerdict::Relevant);
        assert!(graded.rationale.is_none());
    }

    #[tokio::test]
    async fn test_llm_grader_error() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_error("timeout"));
        let grader = LlmRelevanceGrader::new(provider, "gpt-4");

        assert!(grader.grade("q", &chunk("text", 0.9)).await.is_err());
    }

    #[tokio::test]
    async fn test_threshold_grader() {
        let grader = ThresholdRelevanceGrader::default();

        let verdicts = [
            grader.grade("q", &chunk("a", 0.85)).await.unwrap().verdict,
            grader.grade("q", &chunk("b", 0.6)).await.unwrap().verdict,
            grader.grade("q", &chunk("c", 0.2)).await.unwrap().verdict,
        ];

        assert_eq!(
            verdicts,
            [
                RelevanceVerdict::Relevant,
                RelevanceVerdict::Ambiguous,
                RelevanceVerdict::Irrelevant
            ]
        );
    }

    #[tokio::test]
    async fn test_hybrid_consults_model_only_when_ambiguous() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply("no"));
        let grader = HybridRelevanceGrader::new(
            RelevanceThresholds::default(),
            LlmRelevanceGrader::new(provider.clone(), "gpt-4"),
        );

        let clear = grader.grade("q", &chunk("a", 0.95)).await.unwrap();
        let low = grader.grade("q", &chunk("b", 0.1)).await.unwrap();
        assert_eq!(provider.call_count(), 0);

        let ambiguous = grader.grade("q", &chunk("c", 0.6)).await.unwrap();

        assert_eq!(clear.verdict, RelevanceVerdict::Relevant);
        assert_eq!(low.verdict, RelevanceVerdict::Irrelevant);
        assert_eq!(ambiguous.verdict, RelevanceVerdict::Irrelevant);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_keyword_grader() {
        let grader = KeywordRelevanceGrader::new();

        let hit = grader
            .grade("What is the capital of France?", &chunk("Paris is the CAPITAL of France.", 0.0))
            .await
            .unwrap();
        let miss = grader
            .grade("What is the capital of France?", &chunk("Photosynthesis uses light.", 0.0))
            .await
            .unwrap();
        let vague = grader.grade("what is it?", &chunk("anything", 0.0)).await.unwrap();

        assert_eq!(hit.verdict, RelevanceVerdict::Relevant);
        assert_eq!(hit.rationale.as_deref(), Some("shared keywords: capital, france"));
        assert_eq!(miss.verdict, RelevanceVerdict::Irrelevant);
        assert_eq!(vague.verdict, RelevanceVerdict::Ambiguous);
    }

    #[test]
    fn test_strategy_selection() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new("mock"));
        let thresholds = RelevanceThresholds::default();

        let names: Vec<&str> = [
            RelevanceStrategy::Llm,
            RelevanceStrategy::Threshold,
            RelevanceStrategy::Hybrid,
            RelevanceStrategy::Keyword,
        ]
        .into_iter()
        .map(|s| relevance_grader_for(s, thresholds, provider.clone(), "m").grader_name())
        .collect();

        assert_eq!(names, vec!["llm", "threshold", "hybrid", "keyword"]);
    }
}
