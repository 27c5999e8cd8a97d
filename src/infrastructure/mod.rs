//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod grading;
pub mod ingestion;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod retrieval;
pub mod services;
pub mod vector_store;
