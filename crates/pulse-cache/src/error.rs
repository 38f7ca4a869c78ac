//! Error types for the fetch cache and durable stores.

use pulse_core::CacheKey;
use thiserror::Error;

/// Boxed error returned by fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`FetchCache`](crate::FetchCache).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The fetcher failed and there was no previous value to fall back to.
    #[error("failed to fetch '{key}': {source}")]
    Fetch {
        key: CacheKey,
        #[source]
        source: BoxError,
    },
}

impl CacheError {
    /// Creates a new fetch error.
    pub fn fetch(key: CacheKey, source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            key,
            source: source.into(),
        }
    }

    /// Returns the key whose fetch failed.
    pub fn key(&self) -> &CacheKey {
        match self {
            Self::Fetch { key, .. } => key,
        }
    }
}

/// Errors raised by a [`DurableStore`](crate::DurableStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    /// A SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The payload could not be encoded or decoded.
    #[error("payload encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored row could not be interpreted.
    #[error("corrupt record for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// The blocking task running the store operation failed.
    #[error("store task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Creates a new corrupt record error.
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
