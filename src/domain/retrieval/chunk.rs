//! Retrieved document chunk

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unit of retrieved text with its source and similarity score
///
/// Produced by a [`Retriever`](super::Retriever) and consumed read-only by the
/// graders and the answer generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk identifier, unique within the active index
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Source document (file name for uploaded PDFs)
    pub source: String,
    /// Similarity score against the query that retrieved it (0.0 - 1.0)
    pub score: f32,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl DocumentChunk {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            score: 0.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let chunk = DocumentChunk::new("c1", "Paris is the capital of France.", "geo.pdf")
            .with_score(0.92)
            .with_metadata("chunk_index", serde_json::json!(0));

        assert_eq!(chunk.source, "geo.pdf");
        assert_eq!(chunk.score, 0.92);
        assert_eq!(chunk.metadata["chunk_index"], 0);
    }

    #[test]
    fn test_empty_metadata_is_not_serialized() {
        let json = serde_json::to_value(DocumentChunk::new("c1", "text", "a.pdf")).unwrap();

        assert!(json.get("metadata").is_none());
        assert_eq!(json["id"], "c1");
    }
}
