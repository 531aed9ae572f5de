//! Mediagate Storage Library
//!
//! Signed access descriptors and object storage behind a single [`Storage`]
//! trait. The S3 variant delegates signing to AWS presigned URLs; the local
//! variant issues application URLs that embed capability tokens and are
//! fulfilled by the gateway's own upload/download endpoints.

pub mod broker;
pub mod factory;
pub mod traits;

#[cfg(feature = "storage-local")]
pub mod local;

#[cfg(feature = "storage-s3")]
pub mod s3;

pub use broker::{AccessBroker, PresignGetRequest, PresignPutRequest};
pub use factory::create_storage;
pub use mediagate_core::StorageBackend;
pub use traits::{GetOptions, PutDescriptor, Storage, StorageError, StorageResult};

#[cfg(feature = "storage-local")]
pub use local::LocalStorage;

#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
