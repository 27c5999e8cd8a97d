//! Document upload endpoint

use axum::extract::{Multipart, State};
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, UploadResponse};
use crate::infrastructure::ingestion::UploadedFile;

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// POST /upload
///
/// Rebuilds the index from every `file` part of the form.
pub async fn upload_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let files = read_files(multipart).await?;

    if files.is_empty() {
        return Err(ApiError::bad_request("No file provided").with_param(FILE_FIELD));
    }

    info!(files = files.len(), "Processing document upload");

    let result = state.rag_service.ingest(files).await?;

    Ok(Json(UploadResponse::from(result)))
}

async fn read_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", name, e.body_text())))?;

        let mut file = UploadedFile::new(name, bytes);
        if let Some(content_type) = content_type {
            file = file.with_content_type(content_type);
        }
        files.push(file);
    }

    Ok(files)
}
