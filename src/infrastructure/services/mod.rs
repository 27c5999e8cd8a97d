//! Infrastructure services

mod rag_service;

pub use rag_service::{NOT_READY_MESSAGE, RagError, RagService};
