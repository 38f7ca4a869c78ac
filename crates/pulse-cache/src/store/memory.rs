//! In-process durable store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use pulse_core::{CacheKey, Payload};

use super::{DurableStore, StoreStats, StoredRecord};
use crate::error::StoreError;

/// A [`DurableStore`] kept in memory.
///
/// Survives cache capacity evictions but not a process restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<CacheKey, StoredRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, keeping its timestamp.
    pub fn insert_record(&self, record: StoredRecord) {
        self.records.write().insert(record.key().clone(), record);
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn read(&self, key: &CacheKey) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn write(&self, key: &CacheKey, value: &Payload) -> Result<(), StoreError> {
        self.insert_record(StoredRecord::new(key.clone(), value.clone(), Utc::now()));
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let records = self.records.read();
        Ok(StoreStats {
            records: records.len() as u64,
            last_write: records.values().map(StoredRecord::stored_at).max(),
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
