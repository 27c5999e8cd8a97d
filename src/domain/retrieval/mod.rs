//! Retrieval domain: chunks, retrievers, and vector stores

mod chunk;
mod retriever;
mod vector_store;

pub use chunk::DocumentChunk;
pub use retriever::Retriever;
pub use vector_store::{SearchParams, StoredChunk, VectorStore};

#[cfg(test)]
pub use retriever::mock::MockRetriever;
