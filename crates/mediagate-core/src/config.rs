//! Configuration module
//!
//! Environment-driven configuration for the gateway service and the
//! thumbnail worker. All settings are read once at startup; `validate()`
//! enforces the constraints the active storage backend needs.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Defaults
const SERVER_PORT: u16 = 4060;
const PUT_URL_EXPIRES_SECS: u64 = 60;
const GET_URL_EXPIRES_SECS: u64 = 300;
const THUMB_MAX_EDGE: u32 = 640;
const THUMB_BATCH: i64 = 10;
const THUMB_DELAY_MS: u64 = 3000;
const THUMB_MAX_ATTEMPTS: i32 = 5;
const LOCAL_STORAGE_PATH: &str = "uploads";

/// Application configuration shared by the gateway and the worker.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    /// Public base URL of this service; embedded in locally issued access URLs.
    pub app_url: String,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    /// Require AES256 server-side encryption on presigned S3 uploads.
    pub require_sse: bool,
    pub local_storage_path: String,
    pub database_url: Option<String>,
    pub put_url_expires_secs: u64,
    pub get_url_expires_secs: u64,
    pub thumb_max_edge: u32,
    pub thumb_batch_size: i64,
    pub thumb_poll_delay_ms: u64,
    pub thumb_max_attempts: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let app_url = env::var("APP_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port));

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(s) => StorageBackend::from_str(&s)?,
            Err(_) => StorageBackend::Local,
        };

        let config = Config {
            server_port,
            app_url,
            environment,
            cors_origins,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for token signing"))?,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            require_sse: env::var("REQUIRE_SSE")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| LOCAL_STORAGE_PATH.to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            put_url_expires_secs: env::var("PUT_URL_EXPIRES_SECS")
                .unwrap_or_else(|_| PUT_URL_EXPIRES_SECS.to_string())
                .parse()
                .unwrap_or(PUT_URL_EXPIRES_SECS),
            get_url_expires_secs: env::var("GET_URL_EXPIRES_SECS")
                .unwrap_or_else(|_| GET_URL_EXPIRES_SECS.to_string())
                .parse()
                .unwrap_or(GET_URL_EXPIRES_SECS),
            thumb_max_edge: env::var("THUMB_MAX_EDGE")
                .unwrap_or_else(|_| THUMB_MAX_EDGE.to_string())
                .parse()
                .unwrap_or(THUMB_MAX_EDGE),
            thumb_batch_size: env::var("THUMB_BATCH")
                .unwrap_or_else(|_| THUMB_BATCH.to_string())
                .parse()
                .unwrap_or(THUMB_BATCH),
            thumb_poll_delay_ms: env::var("THUMB_DELAY_MS")
                .unwrap_or_else(|_| THUMB_DELAY_MS.to_string())
                .parse()
                .unwrap_or(THUMB_DELAY_MS),
            thumb_max_attempts: env::var("THUMB_MAX_ATTEMPTS")
                .unwrap_or_else(|_| THUMB_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(THUMB_MAX_ATTEMPTS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must not be empty when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4060,
            app_url: "http://localhost:4060".to_string(),
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            require_sse: true,
            local_storage_path: "uploads".to_string(),
            database_url: None,
            put_url_expires_secs: 60,
            get_url_expires_secs: 300,
            thumb_max_edge: 640,
            thumb_batch_size: 10,
            thumb_poll_delay_ms: 3000,
            thumb_max_attempts: 5,
        }
    }

    #[test]
    fn short_secret_rejected() {
        let mut config = base_config();
        config.jwt_secret = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("media".to_string());
        assert!(config.validate().is_err());

        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_rejects_wildcard_cors() {
        let mut config = base_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(config.validate().is_ok());
    }
}
