//! Document upload and field extraction

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::{extract_fields, ExtractedFields};
use crate::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub filename: Option<String>,
    pub size_bytes: usize,
    pub extracted_fields: ExtractedFields,
}

/// POST /api/doctor/extract-pdf
///
/// Multipart body with one `file` part.
pub async fn extract_document(mut multipart: Multipart) -> ApiResult<Json<ExtractResponse>> {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = upload
        .ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' part", FILE_FIELD)))?;

    let extracted_fields = extract_fields(&bytes).map_err(|e| {
        warn!(filename = ?filename, error = %e, "Document extraction failed");
        ApiError::BadRequest(e.to_string())
    })?;

    info!(filename = ?filename, size_bytes = bytes.len(), "Document fields extracted");

    Ok(Json(ExtractResponse {
        filename,
        size_bytes: bytes.len(),
        extracted_fields,
    }))
}

/// Build extraction routes with the upload size limit applied
pub fn extract_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/doctor/extract-pdf", post(extract_document))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
