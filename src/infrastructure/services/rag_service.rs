//! Question answering over the uploaded documents
//!
//! Owns the vector index, the ingestion pipeline that rebuilds it, and the
//! correction loop that answers questions against it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::DomainError;
use crate::domain::correction::{CorrectionError, CorrectionLoop, RunResult};
use crate::domain::ingestion::{ChunkingConfig, IngestionResult};
use crate::domain::retrieval::VectorStore;
use crate::infrastructure::grading::{
    LlmAnswerGenerator, LlmAnswerGrader, LlmQueryRewriter, relevance_grader_for,
};
use crate::infrastructure::ingestion::{IngestionService, UploadedFile};
use crate::infrastructure::llm::ModelBackends;
use crate::infrastructure::observability::{
    record_collaborator_error, record_ingestion, record_rewrite, record_run,
};
use crate::infrastructure::retrieval::EmbeddingRetriever;
use crate::infrastructure::vector_store::InMemoryVectorStore;

/// Message returned when a question arrives before any document is indexed
pub const NOT_READY_MESSAGE: &str = "Please upload a document first.";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("{}", NOT_READY_MESSAGE)]
    NotReady,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Correction(#[from] CorrectionError),
}

#[derive(Debug, Clone)]
pub struct RagService {
    store: Arc<dyn VectorStore>,
    ingestion: IngestionService,
    correction: CorrectionLoop,
}

impl RagService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        ingestion: IngestionService,
        correction: CorrectionLoop,
    ) -> Self {
        Self {
            store,
            ingestion,
            correction,
        }
    }

    /// Wire the model-backed collaborators around a fresh in-memory index
    pub fn from_config(config: &AppConfig, backends: &ModelBackends) -> Self {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let temperature = config.llm.temperature;

        let mut retriever = EmbeddingRetriever::new(
            backends.embedder.clone(),
            store.clone(),
            &backends.embedding_model,
        )
        .with_top_k(config.ingestion.top_k);
        if let Some(min_score) = config.ingestion.min_score {
            retriever = retriever.with_min_score(min_score);
        }

        let relevance_grader = relevance_grader_for(
            config.correction.relevance_strategy,
            config.correction.relevance_thresholds,
            backends.chat.clone(),
            &backends.grader_model,
        );

        let generator = LlmAnswerGenerator::new(backends.chat.clone(), &backends.generation_model)
            .with_temperature(temperature);
        let answer_grader = LlmAnswerGrader::new(backends.chat.clone(), &backends.grader_model)
            .with_temperature(temperature);
        let rewriter = LlmQueryRewriter::new(backends.chat.clone(), &backends.generation_model)
            .with_temperature(temperature);

        let correction = CorrectionLoop::new(
            Arc::new(retriever),
            relevance_grader,
            Arc::new(generator),
            Arc::new(answer_grader),
            Arc::new(rewriter),
        )
        .with_config(config.correction.clone());

        let chunking = ChunkingConfig::new(config.ingestion.chunk_size, config.ingestion.chunk_overlap);
        let ingestion = IngestionService::new(
            backends.embedder.clone(),
            store.clone(),
            &backends.embedding_model,
        )
        .with_chunking(chunking)
        .with_batch_size(config.ingestion.embedding_batch_size);

        Self::new(store, ingestion, correction)
    }

    /// Rebuild the index from the uploaded files
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestionResult, RagError> {
        let result = self.ingestion.ingest(files).await?;

        record_ingestion(
            result.chunks_indexed,
            Duration::from_millis(result.duration_ms),
        );

        Ok(result)
    }

    /// Answer a question against the current index
    pub async fn ask(&self, question: &str) -> Result<RunResult, RagError> {
        if question.trim().is_empty() {
            return Err(CorrectionError::InvalidQuestion.into());
        }

        if !self.is_ready().await? {
            return Err(RagError::NotReady);
        }

        let result = match self.correction.run(question).await {
            Ok(result) => result,
            Err(e) => {
                if let Some(collaborator) = e.collaborator() {
                    record_collaborator_error(collaborator.as_str());
                }
                warn!(error = %e, "Correction run failed");
                return Err(e.into());
            }
        };

        record_run(
            result.termination.as_str(),
            Duration::from_millis(result.duration_ms),
            result.retrieval_attempts,
            result.generation_attempts,
        );
        for reason in &result.rewrite_reasons {
            record_rewrite(reason.as_str());
        }

        info!(
            run_id = %result.run_id,
            termination = result.termination.as_str(),
            rewrites = result.rewrites(),
            duration_ms = result.duration_ms,
            "Question answered"
        );

        Ok(result)
    }

    pub async fn chunk_count(&self) -> Result<usize, RagError> {
        Ok(self.store.count().await?)
    }

    pub async fn is_ready(&self) -> Result<bool, RagError> {
        Ok(self.chunk_count().await? > 0)
    }
}
