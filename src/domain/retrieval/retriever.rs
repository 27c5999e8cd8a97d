//! Retriever trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::DocumentChunk;
use crate::domain::DomainError;

/// Returns chunks for a query, best match first
#[async_trait]
pub trait Retriever: Send + Sync + Debug {
    /// Retrieve chunks for the query; an empty result is not an error
    async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>, DomainError>;

    /// Get the retriever name
    fn retriever_name(&self) -> &'static str;
}
