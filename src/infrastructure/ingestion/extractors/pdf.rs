//! PDF text extraction

use super::has_extension;
use crate::domain::DomainError;
use crate::domain::ingestion::{ExtractedDocument, TextExtractor};

/// Extracts the text layer of a PDF with `pdf-extract`
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8], source: &str) -> Result<ExtractedDocument, DomainError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(DomainError::extraction(format!(
                "{} is not a PDF document",
                source
            )));
        }

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DomainError::extraction(format!("Failed to read {}: {}", source, e)))?;

        Ok(ExtractedDocument::new(source, text))
    }

    fn supports(&self, source: &str, content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
            || has_extension(source, &["pdf"])
    }

    fn extractor_name(&self) -> &'static str {
        "pdf"
    }
}
