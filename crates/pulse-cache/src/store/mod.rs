//! Durable side-store abstraction.
//!
//! The fetch cache treats durable storage as a replaceable key-value
//! facility. It is only consulted for keys that carry a
//! [`WritePolicy`](crate::WritePolicy).

mod memory;
mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{CacheKey, Payload};
use serde::Serialize;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A value persisted in a durable store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    key: CacheKey,
    value: Payload,
    stored_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Creates a new record.
    pub fn new(key: CacheKey, value: Payload, stored_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            stored_at,
        }
    }

    /// Returns the record key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Returns the stored payload.
    pub fn value(&self) -> &Payload {
        &self.value
    }

    /// Consumes the record and returns the payload.
    pub fn into_value(self) -> Payload {
        self.value
    }

    /// Returns when the record was written.
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Age of the record relative to `now`. Future timestamps count as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Summary of a durable store's contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    /// Number of persisted records.
    pub records: u64,
    /// Time of the most recent write.
    pub last_write: Option<DateTime<Utc>>,
}

/// A durable key-value store backing selected cache keys.
///
/// # Implementors
///
/// - `MemoryStore` - process-local map, for tests and diskless deployments
/// - `SqliteStore` - single SQLite table keyed by cache key
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Reads the record stored under `key`, if any.
    async fn read(&self, key: &CacheKey) -> Result<Option<StoredRecord>, StoreError>;

    /// Stores `value` under `key`, stamped with the current time.
    async fn write(&self, key: &CacheKey, value: &Payload) -> Result<(), StoreError>;

    /// Returns record count and last write time.
    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Returns the name of this store, used in logs.
    fn name(&self) -> &str;
}
