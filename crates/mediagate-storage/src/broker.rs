//! Signed access broker
//!
//! Thin dispatch layer between the presign endpoints and the active storage
//! backend. Callers never learn which variant is behind it; they receive a
//! descriptor or URL either way.

use crate::traits::{GetOptions, PutDescriptor, Storage, StorageError, StorageResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Request body for upload descriptor issuance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignPutRequest {
    pub key: String,
    pub content_type: Option<String>,
    /// Expiry override in whole seconds.
    pub expires: Option<u64>,
}

/// Request body for download URL issuance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignGetRequest {
    pub key: String,
    pub expires: Option<u64>,
    pub download_name: Option<String>,
    pub response_content_type: Option<String>,
}

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct AccessBroker {
    storage: Arc<dyn Storage>,
    default_put_expires: Duration,
    default_get_expires: Duration,
}

impl AccessBroker {
    pub fn new(
        storage: Arc<dyn Storage>,
        default_put_expires: Duration,
        default_get_expires: Duration,
    ) -> Self {
        Self {
            storage,
            default_put_expires,
            default_get_expires,
        }
    }

    pub async fn presigned_put_url(
        &self,
        request: &PresignPutRequest,
    ) -> StorageResult<PutDescriptor> {
        let key = validated_key(&request.key)?;
        let content_type = request
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        let expires = request
            .expires
            .map(Duration::from_secs)
            .unwrap_or(self.default_put_expires);

        self.storage
            .issue_put_descriptor(key, content_type, expires)
            .await
    }

    pub async fn presigned_get_url(&self, request: &PresignGetRequest) -> StorageResult<String> {
        let key = validated_key(&request.key)?;
        let expires = request
            .expires
            .map(Duration::from_secs)
            .unwrap_or(self.default_get_expires);

        self.storage
            .issue_get_descriptor(
                key,
                expires,
                GetOptions {
                    download_name: request.download_name.clone(),
                    response_content_type: request.response_content_type.clone(),
                },
            )
            .await
    }
}

fn validated_key(key: &str) -> StorageResult<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(key)
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::LocalStorage;
    use mediagate_core::TokenCodec;
    use tempfile::tempdir;

    const SECRET: &str = "broker-test-secret-0123456789abcdef!";

    async fn broker(dir: &std::path::Path) -> AccessBroker {
        let storage = LocalStorage::new(
            dir,
            "http://localhost:4060".to_string(),
            TokenCodec::new(SECRET),
        )
        .await
        .unwrap();
        AccessBroker::new(
            Arc::new(storage),
            Duration::from_secs(60),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn put_defaults_to_octet_stream() {
        let dir = tempdir().unwrap();
        let broker = broker(dir.path()).await;

        let descriptor = broker
            .presigned_put_url(&PresignPutRequest {
                key: "media/blob".to_string(),
                content_type: None,
                expires: None,
            })
            .await
            .unwrap();

        assert_eq!(
            descriptor.required_headers.get("Content-Type"),
            Some(&DEFAULT_CONTENT_TYPE.to_string())
        );
    }

    #[tokio::test]
    async fn empty_key_rejected() {
        let dir = tempdir().unwrap();
        let broker = broker(dir.path()).await;

        let result = broker
            .presigned_get_url(&PresignGetRequest {
                key: "   ".to_string(),
                expires: None,
                download_name: None,
                response_content_type: None,
            })
            .await;

        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn descriptor_serializes_with_camel_case_headers_field() {
        let dir = tempdir().unwrap();
        let broker = broker(dir.path()).await;

        let descriptor = broker
            .presigned_put_url(&PresignPutRequest {
                key: "media/a.png".to_string(),
                content_type: Some("image/png".to_string()),
                expires: Some(120),
            })
            .await
            .unwrap();

        let json = serde_json::to_value(&descriptor).unwrap();
        assert!(json.get("requiredHeaders").is_some());
        assert_eq!(json["key"], "media/a.png");
    }
}
