use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::auth::CurrentUser;
use crate::database::Repository;
use crate::models::document::DocumentResponse;
use crate::services::DocumentService;
use crate::utils::error::ApiError;

/// Upload a document to the knowledge base
pub async fn upload_document(
    Extension(document_service): Extension<Arc<DocumentService>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::BadRequest("file required".to_string()))?;
    let filename = filename.unwrap_or_else(|| "untitled".to_string());

    info!("Upload from user {}: {}", user.id, filename);

    let document = document_service
        .ingest(user.id, &filename, file_data, content_type.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

/// List the caller's documents, newest first
pub async fn list_documents(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let documents = repository
        .list_documents(user.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(
        documents.into_iter().map(DocumentResponse::from).collect(),
    ))
}
