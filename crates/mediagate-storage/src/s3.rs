use crate::traits::{GetOptions, PutDescriptor, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use mediagate_core::StorageBackend;
use std::collections::HashMap;
use std::time::Duration;

/// S3 storage implementation
///
/// A stateless signing delegate: descriptor issuance produces true AWS
/// presigned URLs scoped to a single key, and the byte-level operations go
/// through the regular S3 API. When `require_sse` is set, presigned uploads
/// are signed with AES256 server-side encryption and the matching header is
/// surfaced in `requiredHeaders`; S3 rejects the write if the client omits it.
#[derive(Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    require_sse: bool,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `require_sse` - Sign uploads with AES256 server-side encryption
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        require_sse: bool,
    ) -> StorageResult<Self> {
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .retry_config(RetryConfig::standard())
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = endpoint_url {
            // S3-compatible providers generally need path-style addressing.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());

        Ok(S3Storage {
            client,
            bucket,
            require_sse,
        })
    }

    fn presigning_config(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn issue_put_descriptor(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<PutDescriptor> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type);

        let mut required_headers = HashMap::new();
        required_headers.insert("Content-Type".to_string(), content_type.to_string());

        if self.require_sse {
            request = request.server_side_encryption(ServerSideEncryption::Aes256);
            required_headers.insert(
                "x-amz-server-side-encryption".to_string(),
                "AES256".to_string(),
            );
        }

        let presigned = request
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_secs = expires_in.as_secs(),
            sse = self.require_sse,
            "Issued presigned upload URL"
        );

        Ok(PutDescriptor {
            url: presigned.uri().to_string(),
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
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);

        if let Some(name) = options.download_name {
            request = request
                .response_content_disposition(format!("attachment; filename=\"{}\"", name));
        }
        if let Some(content_type) = options.response_content_type {
            request = request.response_content_type(content_type);
        }

        let presigned = request
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_secs = expires_in.as_secs(),
            "Issued presigned download URL"
        );

        Ok(presigned.uri().to_string())
    }

    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    tracing::error!(
                        error = %service_error,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 download failed"
                    );
                    StorageError::DownloadFailed(service_error.to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data)
    }

    async fn store(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let size = data.len();
        let start = std::time::Instant::now();

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data));

        if self.require_sse {
            request = request.server_side_encryption(ServerSideEncryption::Aes256);
        }

        request.send().await.map_err(|e| {
            let service_error = e.into_service_error();
            tracing::error!(
                error = %service_error,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(service_error.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::BackendError(service_error.to_string()))
                }
            }
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
