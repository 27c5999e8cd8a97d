//! Self-correcting retrieval-augmented question answering
//!
//! Answers questions against uploaded documents with a control loop that
//! grades its own retrieval and answers, rewriting the question and retrying
//! when either falls short:
//! - Ingestion: PDF or text extraction, recursive chunking, embeddings, in-memory index
//! - Correction loop: retrieve, grade chunks, generate, grade answer, rewrite
//! - OpenAI or local Ollama models behind one provider trait

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::llm::LlmProviderFactory;
use infrastructure::services::RagService;

/// Build the question answering service from configuration
pub fn create_rag_service(config: &AppConfig) -> anyhow::Result<RagService> {
    let backends = LlmProviderFactory::create(&config.llm, &config.embedding)?;

    Ok(RagService::from_config(config, &backends))
}

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let rag_service = create_rag_service(config)?;

    Ok(AppState::new(Arc::new(rag_service)))
}
