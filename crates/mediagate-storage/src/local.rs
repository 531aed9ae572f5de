use crate::traits::{GetOptions, PutDescriptor, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use mediagate_core::{Operation, StorageBackend, TokenCodec};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// Local filesystem storage gateway
///
/// Descriptors issued by this backend point back at the application itself
/// (`/api/storage/upload` and `/api/storage/file/...`) and embed a capability
/// token scoped to the operation and key. The gateway's fulfillment handlers
/// verify the token and stream bytes through [`LocalStorage::write_stream`]
/// and [`LocalStorage::read_stream`].
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    codec: TokenCodec,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "uploads")
    /// * `base_url` - Public base URL of the application (e.g., "http://localhost:4060")
    /// * `codec` - Token codec used to sign access URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        codec: TokenCodec,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            codec,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// The resolved path must stay under the base storage directory. Every
    /// filesystem operation goes through this check, on reads and writes.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        } else {
            let mut current = path.clone();
            loop {
                if current == self.base_path {
                    break;
                }
                if let Some(parent) = current.parent() {
                    let parent_buf = parent.to_path_buf();
                    if parent_buf.strip_prefix(&self.base_path).is_err()
                        && parent_buf != self.base_path
                    {
                        return Err(StorageError::InvalidKey(
                            "Storage key resolves outside storage directory".to_string(),
                        ));
                    }
                    current = parent_buf;
                } else {
                    break;
                }
            }
        }

        Ok(path)
    }

    fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Stream an upload body to `key`, creating parent directories as needed.
    /// Returns the number of bytes written.
    pub async fn write_stream<R>(&self, key: &str, mut reader: R) -> StorageResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(bytes_copied)
    }

    /// Open the object at `key` as a byte stream for download responses.
    pub async fn read_stream(&self, key: &str) -> StorageResult<ReaderStream<fs::File>> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        Ok(ReaderStream::new(file))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn issue_put_descriptor(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<PutDescriptor> {
        // Reject bad keys at issuance so clients fail fast, not at upload time.
        self.key_to_path(key)?;

        let token = self
            .codec
            .issue(Operation::Put, key, expires_in)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let url = format!(
            "{}/api/storage/upload?key={}&token={}",
            self.base_url(),
            urlencoding::encode(key),
            token
        );

        let mut required_headers = HashMap::new();
        required_headers.insert("Content-Type".to_string(), content_type.to_string());

        Ok(PutDescriptor {
            url,
            key: key.to_string(),
            required_headers,
        })
    }

    async fn issue_get_descriptor(
        &self,
        key: &str,
        expires_in: Duration,
        options: GetOptions,
    ) -> StorageResult<String> {
        self.key_to_path(key)?;

        let token = self
            .codec
            .issue(Operation::Get, key, expires_in)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        // download_name is not supported by the local fulfillment endpoint.
        let mut url = format!("{}/api/storage/file/{}?token={}", self.base_url(), key, token);

        if let Some(content_type) = options.response_content_type {
            url.push_str("&responseContentType=");
            url.push_str(&urlencoding::encode(&content_type));
        }

        Ok(url)
    }

    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn store(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SECRET: &str = "local-storage-test-secret-0123456789";

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(
            dir,
            "http://localhost:4060".to_string(),
            TokenCodec::new(SECRET),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_fetch_round_trip() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let data = b"test data".to_vec();
        storage
            .store("media/test.txt", data.clone(), "text/plain")
            .await
            .unwrap();

        let fetched = storage.fetch("media/test.txt").await.unwrap();
        assert_eq!(data, fetched);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.fetch("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.store("../escape.txt", b"x".to_vec(), "text/plain").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .issue_put_descriptor("../escape.txt", "text/plain", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .store("exists.txt", b"test".to_vec(), "text/plain")
            .await
            .unwrap();

        assert!(storage.exists("exists.txt").await.unwrap());
        assert!(!storage.exists("nonexistent.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.fetch("missing.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_descriptor_embeds_scoped_token() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let descriptor = storage
            .issue_put_descriptor("media/photo 1.png", "image/png", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(descriptor
            .url
            .starts_with("http://localhost:4060/api/storage/upload?key=media%2Fphoto%201.png&token="));
        assert_eq!(descriptor.key, "media/photo 1.png");
        assert_eq!(
            descriptor.required_headers.get("Content-Type"),
            Some(&"image/png".to_string())
        );

        let token = descriptor.url.split("token=").nth(1).unwrap();
        let grant = TokenCodec::new(SECRET).verify(token).unwrap();
        assert!(grant.allows(Operation::Put, "media/photo 1.png"));
        assert!(!grant.allows(Operation::Get, "media/photo 1.png"));
    }

    #[tokio::test]
    async fn test_get_descriptor_carries_content_type_override() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let url = storage
            .issue_get_descriptor(
                "media/clip.bin",
                Duration::from_secs(300),
                GetOptions {
                    download_name: Some("ignored.bin".to_string()),
                    response_content_type: Some("video/mp4".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:4060/api/storage/file/media/clip.bin?token="));
        assert!(url.ends_with("&responseContentType=video%2Fmp4"));

        let token = url
            .split("token=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap();
        let grant = TokenCodec::new(SECRET).verify(token).unwrap();
        assert!(grant.allows(Operation::Get, "media/clip.bin"));
    }

    #[tokio::test]
    async fn test_write_and_read_stream() {
        use futures::StreamExt;

        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let data = b"stream test data".to_vec();
        let written = storage
            .write_stream("media/stream.txt", std::io::Cursor::new(data.clone()))
            .await
            .unwrap();
        assert_eq!(written, data.len() as u64);

        let mut stream = storage.read_stream("media/stream.txt").await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, downloaded);
    }
}
