// =============================================================================
// UPLOAD HANDLERS
// =============================================================================
// Product images and videos are streamed to the backend untouched (the body
// is usually multipart/form-data). The route carries a body limit; a body
// over it is answered with 413 and a hint to shrink the file.
// =============================================================================

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::{bearer_token, observe};
use crate::client::UploadKind;
use crate::error::{AppError, AppResult, TOO_LARGE_MESSAGE};
use crate::AppState;

/// POST /api/v1/upload/image
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let result = forward(&state, &headers, UploadKind::Image, body).await;
    observe("POST", "/api/v1/upload/image", start, result).map(Json)
}

/// POST /api/v1/upload/video
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let result = forward(&state, &headers, UploadKind::Video, body).await;
    observe("POST", "/api/v1/upload/video", start, result).map(Json)
}

async fn forward(
    state: &AppState,
    headers: &HeaderMap,
    kind: UploadKind,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Value> {
    let token = bearer_token(headers)?;
    let content_type = content_type(headers)?;
    let body = read_body(body)?;

    tracing::info!(kind = ?kind, bytes = body.len(), "Forwarding upload");
    let uploaded = state.client.upload(&token, kind, &content_type, body).await?;
    Ok(uploaded)
}

fn content_type(headers: &HeaderMap) -> AppResult<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("Content-Type header is required".to_string()))
}

/// Map body rejections, turning the body limit into our 413
fn read_body(body: Result<Bytes, BytesRejection>) -> AppResult<Bytes> {
    match body {
        Ok(bytes) if bytes.is_empty() => Err(AppError::BadRequest("Upload body is empty".to_string())),
        Ok(bytes) => Ok(bytes),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(AppError::PayloadTooLarge(TOO_LARGE_MESSAGE.to_string()))
        }
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}
