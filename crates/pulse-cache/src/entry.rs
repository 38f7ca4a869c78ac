//! Cached dataset entries.

use std::sync::Arc;
use std::time::Duration;

use pulse_core::{CacheKey, Payload};
use tokio::time::Instant;

/// A dataset value together with the moment it was populated.
///
/// Timestamps use tokio's clock so that freshness follows a paused test
/// runtime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: CacheKey,
    value: Arc<Payload>,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Creates an entry populated now.
    pub fn new(key: CacheKey, value: Arc<Payload>, ttl: Duration) -> Self {
        Self::with_fetched_at(key, value, ttl, Instant::now())
    }

    /// Creates an entry with an explicit population time.
    pub fn with_fetched_at(
        key: CacheKey,
        value: Arc<Payload>,
        ttl: Duration,
        fetched_at: Instant,
    ) -> Self {
        Self {
            key,
            value,
            fetched_at,
            ttl,
        }
    }

    /// Returns the dataset key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Returns the cached payload.
    pub fn value(&self) -> &Payload {
        &self.value
    }

    /// Returns a shared handle to the cached payload.
    pub fn shared_value(&self) -> Arc<Payload> {
        Arc::clone(&self.value)
    }

    /// Returns when the entry was last populated.
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Returns the TTL the entry was stored with.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time elapsed since population.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Returns true while the entry is younger than `ttl`.
    pub fn is_fresh_for(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    /// Returns true while the entry is younger than its own TTL.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_for(self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(ttl: Duration) -> CacheEntry {
        CacheEntry::new(
            CacheKey::new("network_stats").unwrap(),
            Arc::new(json!({"transactions": 10})),
            ttl,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let entry = entry(Duration::from_secs(60));
        assert!(entry.is_fresh());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(entry.is_fresh());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!entry.is_fresh());
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_uses_requested_ttl() {
        let entry = entry(Duration::from_secs(300));
        tokio::time::advance(Duration::from_secs(90)).await;

        assert!(entry.is_fresh());
        assert!(!entry.is_fresh_for(Duration::from_secs(60)));
        assert_eq!(entry.age(), Duration::from_secs(90));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let entry = entry(Duration::ZERO);
        assert!(!entry.is_fresh());
        assert_eq!(entry.value()["transactions"], 10);
    }
}
