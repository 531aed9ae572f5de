//! Content record access
//!
//! The pipeline only reads and writes the thumbnail-related columns of
//! content records. Queries are built at runtime so the crate compiles
//! without a database connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RecordResult<T> = Result<T, RecordStoreError>;

/// The thumbnail-relevant subset of a content record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentRecord {
    pub id: Uuid,
    pub file_key: String,
    pub file_mime: String,
    pub thumb_key: Option<String>,
    pub thumb_pending: bool,
    pub thumb_attempts: i32,
    pub thumb_error: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence seam for the thumbnail pipeline.
///
/// Each mutation maps to one outcome of the per-record state machine; the
/// flag combinations are fixed here so callers cannot produce inconsistent
/// states.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the oldest records still eligible for thumbnail derivation:
    /// pending, not removed, and below the attempt cap.
    async fn find_pending(&self, batch: i64, max_attempts: i32)
        -> RecordResult<Vec<ContentRecord>>;

    /// Successful derivation: set the thumbnail key, clear pending state,
    /// clear any stale error, reset the attempt counter.
    async fn mark_derived(&self, id: Uuid, thumb_key: &str) -> RecordResult<()>;

    /// Non-image source: permanently out of scope, no error recorded.
    async fn skip_non_image(&self, id: Uuid) -> RecordResult<()>;

    /// Terminal failure (missing source): error retained for operators,
    /// record leaves the pending pool.
    async fn fail_terminal(&self, id: Uuid, error: &str) -> RecordResult<()>;

    /// Transient failure: bump the attempt counter and record the error.
    /// `still_pending` is false once the attempt cap is reached.
    async fn fail_attempt(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        still_pending: bool,
    ) -> RecordResult<()>;
}

/// PostgreSQL-backed record store.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_pending(
        &self,
        batch: i64,
        max_attempts: i32,
    ) -> RecordResult<Vec<ContentRecord>> {
        let records = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT id, file_key, file_mime, thumb_key, thumb_pending,
                   thumb_attempts, thumb_error, status, created_at
            FROM content_records
            WHERE thumb_pending = TRUE
              AND status <> 'removed'
              AND thumb_attempts < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(max_attempts)
        .bind(batch)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn mark_derived(&self, id: Uuid, thumb_key: &str) -> RecordResult<()> {
        sqlx::query(
            r#"
            UPDATE content_records
            SET thumb_key = $2,
                thumb_pending = FALSE,
                thumb_error = NULL,
                thumb_attempts = 0
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(thumb_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn skip_non_image(&self, id: Uuid) -> RecordResult<()> {
        sqlx::query(
            r#"
            UPDATE content_records
            SET thumb_pending = FALSE,
                thumb_error = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail_terminal(&self, id: Uuid, error: &str) -> RecordResult<()> {
        sqlx::query(
            r#"
            UPDATE content_records
            SET thumb_pending = FALSE,
                thumb_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail_attempt(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        still_pending: bool,
    ) -> RecordResult<()> {
        sqlx::query(
            r#"
            UPDATE content_records
            SET thumb_attempts = $2,
                thumb_error = $3,
                thumb_pending = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .bind(still_pending)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
