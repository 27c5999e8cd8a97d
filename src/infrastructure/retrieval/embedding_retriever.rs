//! Dense retriever: embed the query, then search the vector store

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::DomainError;
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::retrieval::{DocumentChunk, Retriever, SearchParams, VectorStore};

#[derive(Debug, Clone)]
pub struct EmbeddingRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    model: String,
    params: SearchParams,
}

impl EmbeddingRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            model: model.into(),
            params: SearchParams::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.params.top_k = top_k.max(1);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.params.min_score = Some(min_score);
        self
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .embedder
            .embed(EmbeddingRequest::single(&self.model, query))
            .await?;

        let embedding = response
            .into_vectors()
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider(self.embedder.provider_name(), "No query embedding returned"))?;

        let chunks = self.store.search(&embedding, &self.params).await?;

        debug!(
            top_k = self.params.top_k,
            returned = chunks.len(),
            "Retrieved chunks"
        );

        Ok(chunks)
    }

    fn retriever_name(&self) -> &'static str {
        "embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::retrieval::StoredChunk;
    use crate::infrastructure::vector_store::InMemoryVectorStore;

    const DIMS: usize = 256;

    async fn indexed_store(embedder: &MockEmbeddingProvider, texts: &[&str]) -> InMemoryVectorStore {
        let vectors = embedder
            .embed(EmbeddingRequest::batch(
                "m",
                texts.iter().map(|t| t.to_string()).collect(),
            ))
            .await
            .unwrap()
            .into_vectors();

        let store = InMemoryVectorStore::new();
        store
            .replace(
                texts
                    .iter()
                    .zip(vectors)
                    .enumerate()
                    .map(|(i, (text, v))| StoredChunk::new(format!("c{}", i), *text, "geo.pdf", v))
                    .collect(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_retrieves_most_similar_first() {
        let embedder = MockEmbeddingProvider::new(DIMS);
        let store = indexed_store(
            &embedder,
            &[
                "Photosynthesis converts sunlight into sugar.",
                "Paris is the capital of France.",
                "The Danube flows through Vienna.",
            ],
        )
        .await;

        let retriever = EmbeddingRetriever::new(Arc::new(embedder), Arc::new(store), "m").with_top_k(2);

        let chunks = retriever.retrieve("What is the capital of France?").await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "c1");
    }

    #[tokio::test]
    async fn test_min_score_drops_unrelated_chunks() {
        let embedder = MockEmbeddingProvider::new(DIMS);
        let store = indexed_store(
            &embedder,
            &[
                "Photosynthesis converts sunlight into sugar.",
                "Paris is the capital of France.",
            ],
        )
        .await;

        let retriever = EmbeddingRetriever::new(Arc::new(embedder), Arc::new(store), "m")
            .with_top_k(4)
            .with_min_score(0.5);

        let chunks = retriever.retrieve("Paris is the capital of France.").await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "c1");
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let store = InMemoryVectorStore::new();
        let retriever = EmbeddingRetriever::new(
            Arc::new(MockEmbeddingProvider::new(DIMS).with_error("should not be called")),
            Arc::new(store),
            "m",
        );

        assert!(retriever.retrieve("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let retriever = EmbeddingRetriever::new(
            Arc::new(MockEmbeddingProvider::new(DIMS).with_error("down")),
            Arc::new(InMemoryVectorStore::new()),
            "m",
        );

        assert!(retriever.retrieve("capital").await.is_err());
    }
}
