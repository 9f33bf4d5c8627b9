//! In-memory store implementations
//!
//! Used when `storage.mode = "memory"` (local development without the
//! storage services) and by the test suite. Semantics mirror the HTTP
//! stores: owner queries page newest-first with a last-seen-id cursor, and
//! the broad scan returns records in an order unrelated to creation time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::storage::model::{GenerationRecord, RecordPage};
use crate::storage::object::{ObjectStore, ObjectStoreError};
use crate::storage::record::{RecordStore, RecordStoreError};

/// In-memory record store
#[derive(Default)]
pub struct MemoryRecordStore {
    records: DashMap<String, GenerationRecord>,
    scan_denied: RwLock<bool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `scan` fail with `ScanDenied`, mimicking a store whose access
    /// policy forbids broad reads
    pub fn deny_scans(&self) {
        *self.scan_denied.write() = true;
    }

    fn sorted_owner_records(&self, owner: &str) -> Vec<GenerationRecord> {
        let mut records: Vec<GenerationRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == owner)
            .map(|entry| entry.value().clone())
            .collect();
        // Newest first; the id tiebreak keeps the cursor stable when two
        // records share a timestamp.
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.generation_id.cmp(&a.generation_id))
        });
        records
    }
}

fn paginate(records: Vec<GenerationRecord>, limit: usize, cursor: Option<&str>) -> RecordPage {
    let start = match cursor {
        Some(cursor) => records
            .iter()
            .position(|r| r.generation_id.to_string() == cursor)
            .map(|idx| idx + 1)
            .unwrap_or(0),
        None => 0,
    };

    let page: Vec<GenerationRecord> = records.into_iter().skip(start).collect();
    let has_more = page.len() > limit;
    let page: Vec<GenerationRecord> = page.into_iter().take(limit).collect();
    let next_cursor = if has_more {
        page.last().map(|r| r.generation_id.to_string())
    } else {
        None
    };

    RecordPage {
        records: page,
        next_cursor,
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ready(&self) -> Result<(), RecordStoreError> {
        Ok(())
    }

    async fn put(&self, record: &GenerationRecord) -> Result<(), RecordStoreError> {
        self.records
            .insert(record.generation_id.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<GenerationRecord>, RecordStoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn query_by_owner(
        &self,
        owner: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RecordStoreError> {
        Ok(paginate(self.sorted_owner_records(owner), limit, cursor))
    }

    async fn count_by_owner(&self, owner: &str) -> Result<u64, RecordStoreError> {
        let count = self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == owner)
            .count();
        Ok(count as u64)
    }

    async fn set_visibility(
        &self,
        id: &str,
        visible: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RecordStoreError> {
        if let Some(mut entry) = self.records.get_mut(id) {
            entry.is_public = visible;
            entry.updated_at = updated_at;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RecordStoreError> {
        self.records.remove(id);
        Ok(())
    }

    async fn scan(&self, limit: usize, cursor: Option<&str>) -> Result<RecordPage, RecordStoreError> {
        if *self.scan_denied.read() {
            return Err(RecordStoreError::ScanDenied);
        }

        // Stable id order, deliberately unrelated to creation time: callers
        // must sort client-side, as with the real store.
        let mut records: Vec<GenerationRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.generation_id.cmp(&b.generation_id));

        Ok(paginate(records, limit, cursor))
    }
}

/// In-memory object store
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, ObjectStoreError> {
        self.objects.insert(key.to_string(), bytes);
        Ok(format!("memory://{}", key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects.remove(key);
        Ok(())
    }
}
