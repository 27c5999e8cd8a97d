//! Document ingestion domain types and traits
//!
//! - `TextExtractor` turns uploaded bytes into text
//! - `ChunkingStrategy` splits the text into chunks for embedding

mod chunker;
mod extractor;
mod result;

pub use chunker::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
pub use extractor::{ExtractedDocument, TextExtractor};
pub use result::IngestionResult;

#[cfg(test)]
pub use extractor::mock::MockTextExtractor;
