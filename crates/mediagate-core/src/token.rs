//! Capability token codec
//!
//! Short-lived HS256 tokens that grant a single operation (`put` or `get`)
//! on a single storage key. A token is self-contained: expiry is the only
//! validity bound and there is no revocation list. Verifying a token proves
//! authenticity; whether the embedded grant covers a requested operation
//! and key is a separate check via [`Grant::allows`].

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Access token expired")]
    Expired,

    #[error("Invalid access token: {0}")]
    Invalid(String),

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

/// Operation a capability token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Put,
    Get,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Put => write!(f, "put"),
            Operation::Get => write!(f, "get"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    op: Operation,
    key: String,
    iat: u64,
    exp: u64,
}

/// A verified token's grant: exactly one operation on exactly one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub operation: Operation,
    pub key: String,
}

impl Grant {
    /// Authorization check, separate from token verification.
    pub fn allows(&self, operation: Operation, key: &str) -> bool {
        self.operation == operation && self.key == key
    }
}

/// Issues and verifies capability tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token granting `operation` on `key` for `ttl`.
    pub fn issue(
        &self,
        operation: Operation,
        key: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            op: operation,
            key: key.to_string(),
            iat: now,
            exp: now + ttl.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Verify a token's signature and expiry and return its grant.
    pub fn verify(&self, token: &str) -> Result<Grant, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock leeway: a token with a 1s TTL must be rejected 2s later.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        Ok(Grant {
            operation: data.claims.op,
            key: data.claims.key,
        })
    }
}
