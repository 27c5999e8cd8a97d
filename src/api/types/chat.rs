//! Request and response bodies for `/chat` and `/upload`

use serde::{Deserialize, Serialize};

use crate::domain::correction::{AnswerConfidence, RunResult, Termination, TraceEntry};
use crate::domain::ingestion::IngestionResult;

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

/// Answer to a chat request, with the loop trace that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Question in effect when the loop stopped, after any rewrites
    pub final_question: String,
    pub original_question: String,
    pub confidence: AnswerConfidence,
    pub termination: Termination,
    pub retrieval_attempts: u32,
    pub generation_attempts: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    pub trace: Vec<TraceEntry>,
}

impl From<RunResult> for ChatResponse {
    fn from(result: RunResult) -> Self {
        Self {
            answer: result.answer,
            final_question: result.final_query,
            original_question: result.original_question,
            confidence: result.confidence,
            termination: result.termination,
            retrieval_attempts: result.retrieval_attempts,
            generation_attempts: result.generation_attempts,
            sources: result.sources,
            trace: result.trace,
        }
    }
}

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File processed and indexed successfully";

/// Body returned by `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Chunks in the rebuilt index
    pub count: usize,
}

impl From<IngestionResult> for UploadResponse {
    fn from(result: IngestionResult) -> Self {
        Self {
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            count: result.chunks_indexed,
        }
    }
}
