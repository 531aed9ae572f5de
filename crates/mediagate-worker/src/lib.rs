//! Mediagate Worker Library
//!
//! The asynchronous thumbnail pipeline: content record access, the
//! per-record derivation state machine, and the cancellable poll loop.

pub mod memory;
pub mod pipeline;
pub mod records;

pub use pipeline::{derive_thumb_key, CycleReport, PipelineConfig, ThumbOutcome, ThumbnailPipeline};
pub use records::{ContentRecord, PgRecordStore, RecordResult, RecordStore, RecordStoreError};
