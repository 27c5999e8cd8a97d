//! In-memory vector store with brute-force cosine search

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::DomainError;
use crate::domain::embedding::cosine_similarity;
use crate::domain::retrieval::{DocumentChunk, SearchParams, StoredChunk, VectorStore};

/// Vector store held in process memory
///
/// The index is rebuilt on every ingestion, so linear search is sufficient.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    chunks: Arc<RwLock<Vec<StoredChunk>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_dimensions(chunks: &[StoredChunk], expected: Option<usize>) -> Result<(), DomainError> {
    let expected = match expected.or_else(|| chunks.first().map(|c| c.embedding.len())) {
        Some(dims) => dims,
        None => return Ok(()),
    };

    if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
        return Err(DomainError::vector_store(format!(
            "Chunk '{}' has {} dimensions, expected {}",
            bad.id,
            bad.embedding.len(),
            expected
        )));
    }

    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn replace(&self, chunks: Vec<StoredChunk>) -> Result<usize, DomainError> {
        check_dimensions(&chunks, None)?;

        let count = chunks.len();
        *self.chunks.write().await = chunks;

        Ok(count)
    }

    async fn add(&self, chunks: Vec<StoredChunk>) -> Result<usize, DomainError> {
        let mut stored = self.chunks.write().await;
        check_dimensions(&chunks, stored.first().map(|c| c.embedding.len()))?;

        let count = chunks.len();
        stored.extend(chunks);

        Ok(count)
    }

    async fn search(
        &self,
        embedding: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<DocumentChunk>, DomainError> {
        let stored = self.chunks.read().await;

        if let Some(first) = stored.first() {
            if first.embedding.len() != embedding.len() {
                return Err(DomainError::vector_store(format!(
                    "Query has {} dimensions, index has {}",
                    embedding.len(),
                    first.embedding.len()
                )));
            }
        }

        let mut scored: Vec<(f32, &StoredChunk)> = stored
            .iter()
            .map(|chunk| (cosine_similarity(embedding, &chunk.embedding), chunk))
            .filter(|(score, _)| params.min_score.is_none_or(|min| *score >= min))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(params.top_k)
            .map(|(score, chunk)| chunk.to_document_chunk(score))
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.chunks.read().await.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.chunks.write().await.clear();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "in_memory"
    }
}
