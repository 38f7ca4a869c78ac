//! # Pulse Cache
//!
//! TTL fetch cache that sits between dashboard consumers and remote APIs.
//!
//! Every data-dependent consumer asks the cache for a named dataset. A fresh
//! entry is served directly; otherwise the caller's fetcher runs and its
//! result replaces the entry. When a fetch fails and an older value exists,
//! the older value is served instead of the error.
//!
//! Selected keys can also be backed by a [`DurableStore`] through a
//! [`WritePolicy`]: a recent durable record is served when the in-memory
//! entry is missing, and accepted fetch results are persisted.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use pulse_cache::{CacheConfig, FetchCache};
//! use pulse_core::CacheKey;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = FetchCache::new(CacheConfig::default());
//! let key = CacheKey::new("market_data")?;
//!
//! let value = cache
//!     .get_or_fetch(
//!         &key,
//!         || async { Ok::<_, std::io::Error>(serde_json::json!({"price": 31.4})) },
//!         Duration::from_secs(60),
//!     )
//!     .await?;
//! assert_eq!(value["price"], 31.4);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod fetch_cache;
pub mod metrics;
pub mod policy;
pub mod store;

// Re-exports
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use error::{BoxError, CacheError, StoreError};
pub use fetch_cache::{CacheLookup, FetchCache, FetchCacheBuilder, Origin};
pub use metrics::CacheMetrics;
pub use policy::WritePolicy;
pub use store::{DurableStore, MemoryStore, SqliteStore, StoreStats, StoredRecord};
