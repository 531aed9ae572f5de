//! Thumbnail pipeline
//!
//! Polls for content records awaiting a thumbnail, derives one per record,
//! and persists the outcome. Records are processed sequentially within a
//! batch; a record that fails transiently becomes eligible again on a later
//! cycle until the attempt cap is reached.

use crate::records::{ContentRecord, RecordResult, RecordStore};
use mediagate_processing::Thumbnailer;
use mediagate_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: i64,
    pub poll_delay: Duration,
    pub max_attempts: i32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_delay: Duration::from_millis(3000),
            max_attempts: 5,
        }
    }
}

/// Derive the thumbnail key for a source key by replacing its final
/// extension with `_thumb.jpg`. Extensionless keys get the suffix appended
/// so the thumbnail never collides with the source object.
pub fn derive_thumb_key(file_key: &str) -> String {
    match file_key.rfind('.') {
        Some(idx) => format!("{}_thumb.jpg", &file_key[..idx]),
        None => format!("{}_thumb.jpg", file_key),
    }
}

/// Outcome of processing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbOutcome {
    /// A thumbnail was rendered and stored.
    Derived { thumb_key: String },
    /// The thumbnail object already existed; the record was marked done.
    AlreadyDerived { thumb_key: String },
    /// Source is not an image; permanently out of scope.
    SkippedNonImage,
    /// Source object is gone; terminal until remediated externally.
    SourceMissing { error: String },
    /// Transient failure; the attempt counter was bumped.
    Failed { error: String },
}

/// Counts for one poll cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleReport {
    pub processed: usize,
    pub derived: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ThumbnailPipeline {
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn Storage>,
    thumbnailer: Thumbnailer,
    config: PipelineConfig,
}

impl ThumbnailPipeline {
    pub fn new(
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn Storage>,
        thumbnailer: Thumbnailer,
        config: PipelineConfig,
    ) -> Self {
        Self {
            records,
            storage,
            thumbnailer,
            config,
        }
    }

    /// Run the per-record state machine and persist the outcome.
    pub async fn process_record(&self, record: &ContentRecord) -> RecordResult<ThumbOutcome> {
        let thumb_key = derive_thumb_key(&record.file_key);

        // Idempotency: a thumbnail object that already exists wins over any
        // recorded state.
        match self.storage.exists(&thumb_key).await {
            Ok(true) => {
                self.records.mark_derived(record.id, &thumb_key).await?;
                return Ok(ThumbOutcome::AlreadyDerived { thumb_key });
            }
            Ok(false) => {}
            Err(e) => {
                return self
                    .record_failure(record, format!("thumbnail existence check failed: {}", e))
                    .await;
            }
        }

        if !record.file_mime.starts_with("image/") {
            self.records.skip_non_image(record.id).await?;
            return Ok(ThumbOutcome::SkippedNonImage);
        }

        match self.storage.exists(&record.file_key).await {
            Ok(true) => {}
            Ok(false) => {
                let error = format!("source object missing: {}", record.file_key);
                self.records.fail_terminal(record.id, &error).await?;
                return Ok(ThumbOutcome::SourceMissing { error });
            }
            Err(e) => {
                return self
                    .record_failure(record, format!("source existence check failed: {}", e))
                    .await;
            }
        }

        let data = match self.storage.fetch(&record.file_key).await {
            Ok(data) => data,
            Err(e) => {
                return self
                    .record_failure(record, format!("source fetch failed: {}", e))
                    .await;
            }
        };

        let thumb = match self.thumbnailer.render(&data) {
            Ok(thumb) => thumb,
            Err(e) => return self.record_failure(record, e.to_string()).await,
        };

        if let Err(e) = self.storage.store(&thumb_key, thumb, "image/jpeg").await {
            return self
                .record_failure(record, format!("thumbnail store failed: {}", e))
                .await;
        }

        self.records.mark_derived(record.id, &thumb_key).await?;
        Ok(ThumbOutcome::Derived { thumb_key })
    }

    async fn record_failure(
        &self,
        record: &ContentRecord,
        error: String,
    ) -> RecordResult<ThumbOutcome> {
        let attempts = record.thumb_attempts + 1;
        let still_pending = attempts < self.config.max_attempts;

        self.records
            .fail_attempt(record.id, attempts, &error, still_pending)
            .await?;

        if !still_pending {
            tracing::warn!(
                record_id = %record.id,
                key = %record.file_key,
                attempts,
                error = %error,
                "Thumbnail derivation exhausted attempts"
            );
        }

        Ok(ThumbOutcome::Failed { error })
    }

    /// Process one batch of pending records.
    pub async fn run_cycle(&self) -> RecordResult<CycleReport> {
        let pending = self
            .records
            .find_pending(self.config.batch_size, self.config.max_attempts)
            .await?;

        let mut report = CycleReport::default();

        for record in &pending {
            report.processed += 1;

            let outcome = self.process_record(record).await?;
            match &outcome {
                ThumbOutcome::Derived { thumb_key }
                | ThumbOutcome::AlreadyDerived { thumb_key } => {
                    report.derived += 1;
                    tracing::info!(
                        record_id = %record.id,
                        key = %record.file_key,
                        thumb_key = %thumb_key,
                        "Thumbnail ready"
                    );
                }
                ThumbOutcome::SkippedNonImage => {
                    report.skipped += 1;
                    tracing::debug!(
                        record_id = %record.id,
                        mime = %record.file_mime,
                        "Skipping non-image record"
                    );
                }
                ThumbOutcome::SourceMissing { error } | ThumbOutcome::Failed { error } => {
                    report.failed += 1;
                    tracing::warn!(
                        record_id = %record.id,
                        key = %record.file_key,
                        error = %error,
                        "Thumbnail derivation failed"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Poll until cancelled. An in-flight cycle always drains before this
    /// returns; cancellation is only observed between cycles.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            batch_size = self.config.batch_size,
            poll_delay_ms = self.config.poll_delay.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Thumbnail pipeline started"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) if report.processed > 0 => {
                    tracing::info!(
                        processed = report.processed,
                        derived = report.derived,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Thumbnail cycle complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Thumbnail cycle failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_delay) => {}
            }
        }

        tracing::info!("Thumbnail pipeline stopped");
    }
}
