//! Text extraction from uploaded files

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Plain text pulled out of an uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Source name (usually the uploaded file name)
    pub source: String,
    pub text: String,
}

impl ExtractedDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Turns raw file bytes into text
///
/// Extraction is CPU-bound; async callers should run it on a blocking thread.
pub trait TextExtractor: Send + Sync + Debug {
    fn extract(&self, bytes: &[u8], source: &str) -> Result<ExtractedDocument, DomainError>;

    /// Whether this extractor handles the file, judged by name and optional MIME type
    fn supports(&self, source: &str, content_type: Option<&str>) -> bool;

    fn extractor_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;

    /// Treats the bytes as UTF-8 text
    #[derive(Debug, Default)]
    pub struct MockTextExtractor;

    impl TextExtractor for MockTextExtractor {
        fn extract(&self, bytes: &[u8], source: &str) -> Result<ExtractedDocument, DomainError> {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| DomainError::extraction(e.to_string()))?;
            Ok(ExtractedDocument::new(source, text))
        }

        fn supports(&self, _source: &str, _content_type: Option<&str>) -> bool {
            true
        }

        fn extractor_name(&self) -> &'static str {
            "mock"
        }
    }
}
