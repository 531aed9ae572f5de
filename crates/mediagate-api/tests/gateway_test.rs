//! End-to-end tests for the gateway over the local storage backend.
//!
//! Each test builds a fresh router on a temp directory and drives it with
//! axum-test, following the URLs the service itself issues.

use axum::http::StatusCode;
use axum_test::TestServer;
use mediagate_api::routes::build_router;
use mediagate_api::state::{build_state, AppState};
use mediagate_core::{Config, Operation, StorageBackend};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;

const SECRET: &str = "gateway-test-secret-0123456789abcdef!";

fn test_config(dir: &TempDir) -> Config {
    Config {
        server_port: 4060,
        app_url: "http://localhost:4060".to_string(),
        environment: "development".to_string(),
        cors_origins: vec!["*".to_string()],
        jwt_secret: SECRET.to_string(),
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        require_sse: true,
        local_storage_path: dir.path().to_string_lossy().into_owned(),
        database_url: None,
        put_url_expires_secs: 60,
        get_url_expires_secs: 300,
        thumb_max_edge: 640,
        thumb_batch_size: 10,
        thumb_poll_delay_ms: 3000,
        thumb_max_attempts: 5,
    }
}

struct Harness {
    server: TestServer,
    state: AppState,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let state = build_state(config).await.unwrap();
    let router = build_router(state.clone()).unwrap();
    Harness {
        server: TestServer::new(router).unwrap(),
        state,
        _dir: dir,
    }
}

/// Pull one query parameter out of an issued URL.
fn query_param(url: &str, name: &str) -> String {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
        .unwrap_or_else(|| panic!("URL {} has no {} parameter", url, name))
        .to_string()
}

/// Strip the public base URL so the path can be replayed against the test server.
fn relative(url: &str, state: &AppState) -> String {
    url.strip_prefix(&state.config.app_url)
        .unwrap_or_else(|| panic!("URL {} not rooted at app URL", url))
        .to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness().await;

    let response = h.server.get("/api/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["ok"], true);
}

#[tokio::test]
async fn presigned_upload_then_download_round_trip() {
    let h = harness().await;
    let payload = b"fake png bytes".to_vec();

    let presign = h
        .server
        .post("/api/storage/presign/upload")
        .json(&json!({ "key": "media/photo.png", "contentType": "image/png" }))
        .await;
    assert_eq!(presign.status_code(), StatusCode::OK);
    let descriptor = presign.json::<Value>();
    assert_eq!(descriptor["key"], "media/photo.png");
    assert_eq!(descriptor["requiredHeaders"]["Content-Type"], "image/png");

    let upload_url = descriptor["url"].as_str().unwrap().to_string();
    let upload = h
        .server
        .put("/api/storage/upload")
        .add_query_param("key", "media/photo.png")
        .add_query_param("token", query_param(&upload_url, "token"))
        .bytes(payload.clone().into())
        .await;
    assert_eq!(upload.status_code(), StatusCode::OK);
    assert_eq!(upload.json::<Value>()["ok"], true);

    let presign_get = h
        .server
        .post("/api/storage/presign/download")
        .json(&json!({ "key": "media/photo.png" }))
        .await;
    assert_eq!(presign_get.status_code(), StatusCode::OK);
    let download_url = presign_get.json::<Value>()["url"]
        .as_str()
        .unwrap()
        .to_string();

    let download = h.server.get(&relative(&download_url, &h.state)).await;
    assert_eq!(download.status_code(), StatusCode::OK);
    assert_eq!(download.header("content-type"), "image/png");
    assert_eq!(download.as_bytes().to_vec(), payload);
}

#[tokio::test]
async fn download_honors_content_type_override() {
    let h = harness().await;
    h.state
        .storage
        .store("media/blob", b"data".to_vec(), "application/octet-stream")
        .await
        .unwrap();

    let presign = h
        .server
        .post("/api/storage/presign/download")
        .json(&json!({ "key": "media/blob", "responseContentType": "text/plain" }))
        .await;
    let url = presign.json::<Value>()["url"].as_str().unwrap().to_string();

    let download = h.server.get(&relative(&url, &h.state)).await;
    assert_eq!(download.status_code(), StatusCode::OK);
    assert_eq!(download.header("content-type"), "text/plain");
}

#[tokio::test]
async fn upload_without_token_is_rejected() {
    let h = harness().await;

    let response = h
        .server
        .put("/api/storage/upload")
        .add_query_param("key", "media/photo.png")
        .bytes(b"data".to_vec().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_without_key_is_rejected() {
    let h = harness().await;
    let token = h
        .state
        .codec
        .issue(Operation::Put, "media/photo.png", Duration::from_secs(60))
        .unwrap();

    let response = h
        .server
        .put("/api/storage/upload")
        .add_query_param("token", token)
        .bytes(b"data".to_vec().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_token_cannot_authorize_upload() {
    let h = harness().await;
    let token = h
        .state
        .codec
        .issue(Operation::Get, "media/photo.png", Duration::from_secs(60))
        .unwrap();

    let response = h
        .server
        .put("/api/storage/upload")
        .add_query_param("key", "media/photo.png")
        .add_query_param("token", token)
        .bytes(b"data".to_vec().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_is_scoped_to_its_key() {
    let h = harness().await;
    let token = h
        .state
        .codec
        .issue(Operation::Put, "media/allowed.png", Duration::from_secs(60))
        .unwrap();

    let response = h
        .server
        .put("/api/storage/upload")
        .add_query_param("key", "media/other.png")
        .add_query_param("token", token)
        .bytes(b"data".to_vec().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let h = harness().await;
    let token = h
        .state
        .codec
        .issue(Operation::Get, "media/photo.png", Duration::from_secs(1))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    let response = h
        .server
        .get("/api/storage/file/media/photo.png")
        .add_query_param("token", token)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn traversal_key_is_rejected_by_the_sandbox() {
    let h = harness().await;
    let token = h
        .state
        .codec
        .issue(Operation::Put, "../../etc/passwd", Duration::from_secs(60))
        .unwrap();

    let response = h
        .server
        .put("/api/storage/upload")
        .add_query_param("key", "../../etc/passwd")
        .add_query_param("token", token)
        .bytes(b"data".to_vec().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_object_returns_not_found() {
    let h = harness().await;
    let token = h
        .state
        .codec
        .issue(Operation::Get, "media/absent.png", Duration::from_secs(60))
        .unwrap();

    let response = h
        .server
        .get("/api/storage/file/media/absent.png")
        .add_query_param("token", token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
