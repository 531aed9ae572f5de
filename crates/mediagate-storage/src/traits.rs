//! Storage abstraction trait
//!
//! This module defines the Storage trait that both backends implement:
//! descriptor issuance for client-direct access plus the byte-level
//! operations the thumbnail worker needs.

use async_trait::async_trait;
use mediagate_core::StorageBackend;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Everything a client needs to perform a direct upload: the URL to PUT to
/// and the headers the write will be rejected without.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutDescriptor {
    pub url: String,
    pub key: String,
    pub required_headers: HashMap<String, String>,
}

/// Optional response shaping for download descriptors.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Serve as an attachment with this filename. Ignored by the local backend.
    pub download_name: Option<String>,
    /// Override the Content-Type of the download response.
    pub response_content_type: Option<String>,
}

/// Storage abstraction trait
///
/// Both backends (S3, local filesystem gateway) implement this trait so the
/// access broker and the thumbnail worker never couple to a specific variant.
/// Descriptors are scoped to exactly one key and expire; they grant nothing
/// beyond the named operation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Issue a time-limited upload descriptor for `key`.
    async fn issue_put_descriptor(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<PutDescriptor>;

    /// Issue a time-limited download URL for `key`.
    async fn issue_get_descriptor(
        &self,
        key: &str,
        expires_in: Duration,
        options: GetOptions,
    ) -> StorageResult<String>;

    /// Read the full object at `key`.
    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Write `data` to `key`, replacing any existing object.
    async fn store(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Check if an object exists at `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
