//! Local gateway fulfillment endpoints
//!
//! Only mounted when the local storage backend is active. The capability
//! token embedded in a locally issued URL is verified first, then checked
//! against the requested operation and key; the path sandbox in the storage
//! layer runs before any filesystem access.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use mediagate_core::{AppError, Operation};
use mediagate_storage::LocalStorage;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    key: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    token: Option<String>,
    #[serde(rename = "responseContentType")]
    response_content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub key: String,
}

fn local_backend(state: &AppState) -> Result<&Arc<LocalStorage>, HttpAppError> {
    state.local.as_ref().ok_or_else(|| {
        AppError::BadRequest("Direct upload is only available with local storage".to_string())
            .into()
    })
}

fn required_param(value: Option<String>, name: &str) -> Result<String, HttpAppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {}", name)).into())
}

pub async fn upload_object(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Body,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let local = local_backend(&state)?;
    let token = required_param(query.token, "token")?;
    let key = required_param(query.key, "key")?;

    let grant = state.codec.verify(&token)?;
    if !grant.allows(Operation::Put, &key) {
        return Err(AppError::Forbidden("Token does not authorize this upload".to_string()).into());
    }

    let stream = body.into_data_stream().map_err(io::Error::other);
    let reader = StreamReader::new(stream);
    local.write_stream(&key, reader).await?;

    Ok(Json(UploadResponse { ok: true, key }))
}

pub async fn download_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    let local = local_backend(&state)?;
    let token = required_param(query.token, "token")?;

    let grant = state.codec.verify(&token)?;
    if !grant.allows(Operation::Get, &key) {
        return Err(
            AppError::Forbidden("Token does not authorize this download".to_string()).into(),
        );
    }

    let stream = local.read_stream(&key).await?;

    let content_type = query
        .response_content_type
        .unwrap_or_else(|| content_type_for_key(&key).to_string());

    Ok((
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Guess a download Content-Type from the key's extension. The local backend
/// stores no metadata, so the extension is all there is to go on.
fn content_type_for_key(key: &str) -> &'static str {
    let extension = key.rsplit('.').next().unwrap_or_default().to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guessed_from_extension() {
        assert_eq!(content_type_for_key("media/a.JPG"), "image/jpeg");
        assert_eq!(content_type_for_key("media/a.png"), "image/png");
        assert_eq!(content_type_for_key("clips/c.mp4"), "video/mp4");
        assert_eq!(content_type_for_key("docs/d.pdf"), "application/pdf");
        assert_eq!(content_type_for_key("blob"), "application/octet-stream");
        assert_eq!(content_type_for_key("archive.xyz"), "application/octet-stream");
    }
}
