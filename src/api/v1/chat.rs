//! Question answering endpoint

use axum::extract::State;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, ChatRequest, ChatResponse, Json};

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(question_len = request.question.len(), "Processing chat request");

    let result = state.rag_service.ask(&request.question).await?;

    Ok(Json(ChatResponse::from(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::mock::{app_state, app_state_with};
    use crate::domain::correction::{AnswerConfidence, LoopStep, Termination};
    use crate::domain::grading::MockAnswerGenerator;
    use crate::infrastructure::ingestion::UploadedFile;
    use axum::http::StatusCode;

    fn question(text: &str) -> Json<ChatRequest> {
        Json(ChatRequest {
            question: text.to_string(),
        })
    }

    async fn upload(state: &AppState) {
        state
            .rag_service
            .ingest(vec![UploadedFile::new(
                "france.txt",
                "Paris is the capital of France.",
            )])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_chat_before_upload() {
        let state = app_state("Paris.");

        let err = chat(State(state), question("What is the capital of France?"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.response.error.message, "Please upload a document first.");
    }

    #[tokio::test]
    async fn test_chat_returns_answer_and_trace() {
        let state = app_state("Paris.");
        upload(&state).await;

        let Json(response) = chat(State(state), question("What is the capital of France?"))
            .await
            .unwrap();

        assert_eq!(response.answer, "Paris.");
        assert_eq!(response.original_question, "What is the capital of France?");
        assert_eq!(response.final_question, "What is the capital of France?");
        assert_eq!(response.termination, Termination::Accepted);
        assert_eq!(response.confidence, AnswerConfidence::High);
        assert_eq!(response.retrieval_attempts, 1);
        assert_eq!(
            response.trace.iter().map(|e| e.step).collect::<Vec<_>>(),
            vec![
                LoopStep::Retrieve,
                LoopStep::GradeDocuments,
                LoopStep::Generate,
                LoopStep::GradeAnswer,
                LoopStep::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_question() {
        let state = app_state("Paris.");
        upload(&state).await;

        let err = chat(State(state), question("   ")).await.unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.response.error.param.as_deref(), Some("question"));
    }

    #[tokio::test]
    async fn test_generator_outage_is_503() {
        let state = app_state_with(MockAnswerGenerator::new().with_error("connection refused"));
        upload(&state).await;

        let err = chat(State(state), question("What is the capital of France?"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            err.response.error.code.as_deref(),
            Some("collaborator_unavailable")
        );
    }
}
