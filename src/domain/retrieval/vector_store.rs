//! Vector store trait definition

use std::collections::HashMap;

use async_trait::async_trait;
use std::fmt::Debug;

use super::DocumentChunk;
use crate::domain::DomainError;

/// A chunk together with its embedding, as held by a vector store
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub content: String,
    pub source: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            metadata: HashMap::new(),
            embedding,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Convert into a retrieval result carrying the given score
    pub fn to_document_chunk(&self, score: f32) -> DocumentChunk {
        DocumentChunk {
            id: self.id.clone(),
            content: self.content.clone(),
            source: self.source.clone(),
            score,
            metadata: self.metadata.clone(),
        }
    }
}

/// Similarity search parameters
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Maximum number of results
    pub top_k: usize,
    /// Results scoring below this are dropped
    pub min_score: Option<f32>,
}

impl SearchParams {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            min_score: None,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Storage and similarity search over embedded chunks
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Atomically swap the whole index for the given chunks
    async fn replace(&self, chunks: Vec<StoredChunk>) -> Result<usize, DomainError>;

    /// Append chunks to the index, returning the number added
    async fn add(&self, chunks: Vec<StoredChunk>) -> Result<usize, DomainError>;

    /// Nearest chunks to the embedding, highest score first
    async fn search(
        &self,
        embedding: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<DocumentChunk>, DomainError>;

    /// Number of indexed chunks
    async fn count(&self) -> Result<usize, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    fn store_name(&self) -> &'static str;
}
