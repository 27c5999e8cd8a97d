//! Ingestion outcome

use serde::{Deserialize, Serialize};

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Sources that were indexed
    pub sources: Vec<String>,
    /// Chunks written to the index by this run
    pub chunks_indexed: usize,
    pub duration_ms: u64,
}

impl IngestionResult {
    pub fn new(sources: Vec<String>, chunks_indexed: usize) -> Self {
        Self {
            sources,
            chunks_indexed,
            duration_ms: 0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
