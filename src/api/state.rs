//! Application state for shared services

use std::sync::Arc;

use crate::domain::correction::RunResult;
use crate::domain::ingestion::IngestionResult;
use crate::infrastructure::ingestion::UploadedFile;
use crate::infrastructure::observability::PrometheusMetrics;
use crate::infrastructure::services::{RagError, RagService};

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub rag_service: Arc<dyn RagServiceTrait>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusMetrics>,
}

impl AppState {
    pub fn new(rag_service: Arc<dyn RagServiceTrait>) -> Self {
        Self {
            rag_service,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<PrometheusMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Trait for question answering and index management
#[async_trait::async_trait]
pub trait RagServiceTrait: Send + Sync {
    async fn ask(&self, question: &str) -> Result<RunResult, RagError>;
    async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestionResult, RagError>;
    async fn chunk_count(&self) -> Result<usize, RagError>;
}

#[async_trait::async_trait]
impl RagServiceTrait for RagService {
    async fn ask(&self, question: &str) -> Result<RunResult, RagError> {
        RagService::ask(self, question).await
    }

    async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestionResult, RagError> {
        RagService::ingest(self, files).await
    }

    async fn chunk_count(&self) -> Result<usize, RagError> {
        RagService::chunk_count(self).await
    }
}
