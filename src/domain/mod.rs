//! Domain layer - Core business logic and entities

pub mod correction;
pub mod embedding;
pub mod error;
pub mod grading;
pub mod ingestion;
pub mod llm;
pub mod retrieval;

pub use error::DomainError;
