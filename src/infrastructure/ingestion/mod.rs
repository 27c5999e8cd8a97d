//! Document ingestion infrastructure
//!
//! Extraction, chunking, and the pipeline that embeds chunks into the vector store.

pub mod chunkers;
pub mod extractors;
mod service;

pub use chunkers::RecursiveChunker;
pub use extractors::{PdfTextExtractor, PlainTextExtractor};
pub use service::{IngestionService, UploadedFile};
