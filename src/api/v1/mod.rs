//! Question answering and document endpoints

pub mod chat;
pub mod documents;

use axum::{Router, routing::post};

use super::state::AppState;

pub fn create_rag_router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/upload", post(documents::upload_documents))
}
