//! Mediagate Core Library
//!
//! This crate provides the shared domain types used by the gateway and the
//! thumbnail worker: configuration, the unified error taxonomy, the storage
//! backend selector, and the capability token codec.

pub mod config;
pub mod error;
pub mod storage_types;
pub mod token;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use token::{Grant, Operation, TokenCodec, TokenError};
