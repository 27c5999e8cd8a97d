//! Upload -> extract -> chunk -> embed -> index

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info};

use super::{PdfTextExtractor, PlainTextExtractor, RecursiveChunker};
use crate::domain::DomainError;
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::ingestion::{
    ChunkingConfig, ChunkingStrategy, ExtractedDocument, IngestionResult, TextExtractor,
};
use crate::domain::retrieval::{StoredChunk, VectorStore};

/// A file handed to the ingestion pipeline
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Builds the vector index from uploaded files
///
/// Each call to [`IngestionService::ingest`] replaces the whole index. A failed
/// ingestion leaves the previous index untouched.
#[derive(Debug, Clone)]
pub struct IngestionService {
    extractors: Vec<Arc<dyn TextExtractor>>,
    chunker: Arc<dyn ChunkingStrategy>,
    chunking: ChunkingConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    embedding_model: String,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl IngestionService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            extractors: vec![
                Arc::new(PdfTextExtractor::new()),
                Arc::new(PlainTextExtractor::new()),
            ],
            chunker: Arc::new(RecursiveChunker::new()),
            chunking: ChunkingConfig::default(),
            embedder,
            embedding_model: embedding_model.into(),
            store,
            batch_size: 64,
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_extractors(mut self, extractors: Vec<Arc<dyn TextExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Ingest the files and swap them in as the active index
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestionResult, DomainError> {
        if files.is_empty() {
            return Err(DomainError::validation("No file provided"));
        }
        self.chunking.validate()?;

        let start = Instant::now();
        let mut sources = Vec::with_capacity(files.len());
        let mut chunks = Vec::new();

        for (position, file) in files.into_iter().enumerate() {
            let document = self.extract(file).await?;

            let pieces = self.chunker.chunk(&document.text, &self.chunking)?;
            debug!(
                source = %document.source,
                chunker = self.chunker.name(),
                chunks = pieces.len(),
                "Chunked document"
            );

            chunks.extend(
                pieces
                    .into_iter()
                    .map(|piece| (position, document.source.clone(), piece)),
            );
            sources.push(document.source);
        }

        if chunks.is_empty() {
            return Err(DomainError::extraction("Documents produced no text chunks"));
        }

        let texts: Vec<String> = chunks.iter().map(|(_, _, c)| c.content.clone()).collect();
        let vectors = self.embed_all(texts).await?;

        let stored: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|((position, source, chunk), vector)| {
                let mut metadata = chunk.metadata.to_json_map();
                metadata.insert("source".to_string(), source.clone().into());

                StoredChunk::new(
                    // Upload position keeps ids unique when two files share a name
                    format!("{}:{}#{}", position, source, chunk.index()),
                    chunk.content,
                    source,
                    vector,
                )
                .with_metadata(metadata)
            })
            .collect();

        let count = self.store.replace(stored).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            sources = ?sources,
            chunks = count,
            store = self.store.store_name(),
            duration_ms,
            "Index rebuilt"
        );

        Ok(IngestionResult::new(sources, count).with_duration_ms(duration_ms))
    }

    async fn extract(&self, file: UploadedFile) -> Result<ExtractedDocument, DomainError> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(&file.name, file.content_type.as_deref()))
            .cloned()
            .ok_or_else(|| {
                DomainError::extraction(format!("Unsupported file type: {}", file.name))
            })?;

        let name = file.name.clone();
        let document = tokio::task::spawn_blocking(move || extractor.extract(&file.bytes, &file.name))
            .await
            .map_err(|e| DomainError::extraction(format!("Extraction of {} aborted: {}", name, e)))??;

        if document.is_blank() {
            return Err(DomainError::extraction(format!(
                "No text could be extracted from {}",
                name
            )));
        }

        Ok(document)
    }

    async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = EmbeddingRequest::batch(&self.embedding_model, batch.to_vec());
            let embedded = self.embedder.embed(request).await?.into_vectors();

            if embedded.len() != batch.len() {
                return Err(DomainError::provider(
                    self.embedder.provider_name(),
                    format!("Expected {} embeddings, got {}", batch.len(), embedded.len()),
                ));
            }

            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}
