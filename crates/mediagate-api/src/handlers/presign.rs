//! Access descriptor issuance
//!
//! These endpoints never touch object bytes; they hand the client a
//! time-limited URL (plus required headers for uploads) and the client
//! talks to the storage tier directly.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use mediagate_storage::{PresignGetRequest, PresignPutRequest, PutDescriptor};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PresignDownloadResponse {
    pub url: String,
}

pub async fn presign_upload(
    State(state): State<AppState>,
    Json(request): Json<PresignPutRequest>,
) -> Result<Json<PutDescriptor>, HttpAppError> {
    let descriptor = state.broker.presigned_put_url(&request).await?;

    tracing::debug!(key = %descriptor.key, "Issued upload descriptor");

    Ok(Json(descriptor))
}

pub async fn presign_download(
    State(state): State<AppState>,
    Json(request): Json<PresignGetRequest>,
) -> Result<Json<PresignDownloadResponse>, HttpAppError> {
    let url = state.broker.presigned_get_url(&request).await?;

    tracing::debug!(key = %request.key, "Issued download URL");

    Ok(Json(PresignDownloadResponse { url }))
}
