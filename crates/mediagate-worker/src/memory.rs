//! In-memory record store
//!
//! Mirrors the PostgreSQL store's query and update semantics so pipeline
//! behavior can be exercised without a database.

use crate::records::{ContentRecord, RecordResult, RecordStore};
use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<ContentRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ContentRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn get(&self, id: Uuid) -> Option<ContentRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn update<F>(&self, id: Uuid, apply: F)
    where
        F: FnOnce(&mut ContentRecord),
    {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            apply(record);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_pending(
        &self,
        batch: i64,
        max_attempts: i32,
    ) -> RecordResult<Vec<ContentRecord>> {
        let mut pending: Vec<ContentRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.thumb_pending && r.status != "removed" && r.thumb_attempts < max_attempts)
            .cloned()
            .collect();

        pending.sort_by_key(|r| r.created_at);
        pending.truncate(batch as usize);
        Ok(pending)
    }

    async fn mark_derived(&self, id: Uuid, thumb_key: &str) -> RecordResult<()> {
        self.update(id, |r| {
            r.thumb_key = Some(thumb_key.to_string());
            r.thumb_pending = false;
            r.thumb_error = None;
            r.thumb_attempts = 0;
        });
        Ok(())
    }

    async fn skip_non_image(&self, id: Uuid) -> RecordResult<()> {
        self.update(id, |r| {
            r.thumb_pending = false;
            r.thumb_error = None;
        });
        Ok(())
    }

    async fn fail_terminal(&self, id: Uuid, error: &str) -> RecordResult<()> {
        self.update(id, |r| {
            r.thumb_pending = false;
            r.thumb_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn fail_attempt(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        still_pending: bool,
    ) -> RecordResult<()> {
        self.update(id, |r| {
            r.thumb_attempts = attempts;
            r.thumb_error = Some(error.to_string());
            r.thumb_pending = still_pending;
        });
        Ok(())
    }
}
