//! Plain text and markdown passthrough

use super::has_extension;
use crate::domain::DomainError;
use crate::domain::ingestion::{ExtractedDocument, TextExtractor};

#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8], source: &str) -> Result<ExtractedDocument, DomainError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            DomainError::extraction(format!("{} is not valid UTF-8: {}", source, e))
        })?;

        Ok(ExtractedDocument::new(source, text))
    }

    fn supports(&self, source: &str, content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| ct.starts_with("text/"))
            || has_extension(source, &["txt", "text", "md", "markdown"])
    }

    fn extractor_name(&self) -> &'static str {
        "plain_text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_utf8() {
        let doc = PlainTextExtractor::new()
            .extract("Café in Paris".as_bytes(), "notes.txt")
            .unwrap();

        assert_eq!(doc.source, "notes.txt");
        assert_eq!(doc.text, "Café in Paris");
    }

    #[test]
    fn test_invalid_utf8() {
        let result = PlainTextExtractor::new().extract(&[0xff, 0xfe, 0x00], "notes.txt");

        assert!(result.is_err());
    }

    #[test]
    fn test_supports() {
        let extractor = PlainTextExtractor::new();

        assert!(extractor.supports("README.md", None));
        assert!(extractor.supports("upload", Some("text/plain; charset=utf-8")));
        assert!(!extractor.supports("paper.pdf", Some("application/pdf")));
        assert!(!extractor.supports("no_extension", None));
    }
}
