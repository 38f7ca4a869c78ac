//! SQLite-backed durable store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use pulse_core::{CacheKey, Payload};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use super::{DurableStore, StoreStats, StoredRecord};
use crate::error::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cache_records (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        stored_at TEXT NOT NULL
    )
";

/// A [`DurableStore`] persisting records in a single SQLite table.
///
/// Queries run on tokio's blocking pool; the connection is shared behind
/// a mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %path.display(), "Durable store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the database path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes `value` under `key` with an explicit timestamp.
    pub async fn write_at(
        &self,
        key: &CacheKey,
        value: &Payload,
        stored_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let key = key.as_str().to_string();
        let encoded = serde_json::to_string(value)?;
        let stamp = format_timestamp(stored_at);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO cache_records (key, value, stored_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (key)
                 DO UPDATE SET value = excluded.value, stored_at = excluded.stored_at",
                params![key, encoded, stamp],
            )?;
            Ok(())
        })
        .await
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            op(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(key, format!("invalid timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn read(&self, key: &CacheKey) -> Result<Option<StoredRecord>, StoreError> {
        let cache_key = key.clone();

        self.with_conn(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT value, stored_at FROM cache_records WHERE key = ?1",
                    params![cache_key.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((value, stored_at)) = row else {
                return Ok(None);
            };

            let value: Payload = serde_json::from_str(&value)
                .map_err(|e| StoreError::corrupt(cache_key.as_str(), e.to_string()))?;
            let stored_at = parse_timestamp(cache_key.as_str(), &stored_at)?;

            Ok(Some(StoredRecord::new(cache_key, value, stored_at)))
        })
        .await
    }

    async fn write(&self, key: &CacheKey, value: &Payload) -> Result<(), StoreError> {
        self.write_at(key, value, Utc::now()).await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.with_conn(|conn| {
            let (records, last): (i64, Option<String>) = conn.query_row(
                "SELECT COUNT(*), MAX(stored_at) FROM cache_records",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let last_write = last
                .map(|raw| parse_timestamp("stats", &raw))
                .transpose()?;

            Ok(StoreStats {
                records: records.max(0) as u64,
                last_write,
            })
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        let payload = json!({"balance": 1250.5, "transfers": [], "daily_flows": []});

        store.write(&key("binance_wallet"), &payload).await.unwrap();

        let record = store.read(&key("binance_wallet")).await.unwrap().unwrap();
        assert_eq!(record.value(), &payload);
        assert!(record.age(Utc::now()) < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        let earlier = Utc::now() - chrono::Duration::hours(1);

        store
            .write_at(&key("upbit_wallet"), &json!({"balance": 1}), earlier)
            .await
            .unwrap();
        store
            .write(&key("upbit_wallet"), &json!({"balance": 2}))
            .await
            .unwrap();

        let record = store.read(&key("upbit_wallet")).await.unwrap().unwrap();
        assert_eq!(record.value()["balance"], 2);
        assert!(record.stored_at() > earlier);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.records, 1);
    }

    #[tokio::test]
    async fn test_missing_key_and_empty_stats() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert!(store.read(&key("nothing")).await.unwrap().is_none());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats::default());
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .write(&key("gateio_wallet"), &json!({"balance": 77}))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let record = reopened.read(&key("gateio_wallet")).await.unwrap().unwrap();
        assert_eq!(record.value()["balance"], 77);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }
}
