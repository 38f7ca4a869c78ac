//! TTL fetch cache using Moka.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use chrono::Utc;
use moka::future::Cache;
use parking_lot::Mutex;
use pulse_core::{CacheKey, Payload};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{BoxError, CacheError};
use crate::metrics::CacheMetrics;
use crate::policy::WritePolicy;
use crate::store::DurableStore;

/// Where a value returned by [`FetchCache::lookup`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// In-memory entry younger than the requested TTL.
    Fresh,
    /// The fetcher ran and its result was stored.
    Fetched,
    /// A recent durable record, used because memory had no entry.
    Durable,
    /// The fetcher failed; the previous value is served instead.
    Stale { reason: String },
}

impl Origin {
    /// Short label used in responses and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Origin::Fresh => "fresh",
            Origin::Fetched => "fetched",
            Origin::Durable => "durable",
            Origin::Stale { .. } => "stale",
        }
    }
}

/// Result of a cache lookup: the value plus how it was obtained.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    value: Arc<Payload>,
    origin: Origin,
}

impl CacheLookup {
    fn new(value: Arc<Payload>, origin: Origin) -> Self {
        Self { value, origin }
    }

    /// Returns the payload.
    pub fn value(&self) -> &Payload {
        &self.value
    }

    /// Consumes the lookup and returns the shared payload.
    pub fn into_value(self) -> Arc<Payload> {
        self.value
    }

    /// Returns where the value came from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns true if the value is a fallback after a failed fetch.
    pub fn is_stale(&self) -> bool {
        matches!(self.origin, Origin::Stale { .. })
    }

    /// Error message of the failed fetch, for stale values.
    pub fn stale_reason(&self) -> Option<&str> {
        match &self.origin {
            Origin::Stale { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Builder for [`FetchCache`].
pub struct FetchCacheBuilder {
    config: CacheConfig,
    store: Option<Arc<dyn DurableStore>>,
    policies: HashMap<CacheKey, WritePolicy>,
}

impl FetchCacheBuilder {
    /// Attaches a durable store used by keys with a write policy.
    pub fn durable_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registers a write policy for `key`.
    pub fn policy(mut self, key: CacheKey, policy: WritePolicy) -> Self {
        self.policies.insert(key, policy);
        self
    }

    /// Builds the cache.
    pub fn build(self) -> FetchCache {
        let metrics = CacheMetrics::new();

        if self.store.is_none() && !self.policies.is_empty() {
            warn!(
                policies = self.policies.len(),
                "Write policies configured without a durable store; they will be ignored"
            );
        }

        let eviction_metrics = metrics.clone();
        let inner = Cache::builder()
            .max_capacity(self.config.max_capacity)
            .eviction_listener(move |_key, _value, cause| {
                let reason = match cause {
                    moka::notification::RemovalCause::Expired => "ttl",
                    moka::notification::RemovalCause::Size => "capacity",
                    moka::notification::RemovalCause::Explicit => "manual",
                    moka::notification::RemovalCause::Replaced => "replaced",
                };
                eviction_metrics.record_eviction(reason);
            })
            .build();

        FetchCache {
            inner,
            config: self.config,
            store: self.store,
            policies: Arc::new(self.policies),
            flights: Arc::new(Mutex::new(HashMap::new())),
            metrics,
        }
    }
}

/// Keyed TTL cache in front of zero-argument fetchers.
///
/// Cloning is cheap; clones share the same entry table, store and metrics.
///
/// Entries are never removed by age. A stale entry stays around so it can
/// be served when its refresh fails. The table is bounded only by
/// `max_capacity`.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use pulse_cache::{CacheConfig, FetchCache, Origin};
/// use pulse_core::CacheKey;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = FetchCache::new(CacheConfig::default());
/// let key = CacheKey::new("staking_stats")?;
///
/// let lookup = cache
///     .lookup(
///         &key,
///         || async { Ok::<_, std::io::Error>(serde_json::json!({"total_validators": 3200})) },
///         Duration::from_secs(300),
///     )
///     .await?;
/// assert_eq!(lookup.origin(), &Origin::Fetched);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FetchCache {
    inner: Cache<CacheKey, Arc<CacheEntry>>,
    config: CacheConfig,
    store: Option<Arc<dyn DurableStore>>,
    policies: Arc<HashMap<CacheKey, WritePolicy>>,
    flights: Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>,
    metrics: CacheMetrics,
}

impl FetchCache {
    /// Creates a memory-only cache.
    pub fn new(config: CacheConfig) -> Self {
        Self::builder(config).build()
    }

    /// Starts building a cache with durable-backed keys.
    pub fn builder(config: CacheConfig) -> FetchCacheBuilder {
        FetchCacheBuilder {
            config,
            store: None,
            policies: HashMap::new(),
        }
    }

    /// Returns the cached value for `key`, fetching it when missing or
    /// older than `ttl`.
    ///
    /// A failed fetch falls back to the previous value when there is one;
    /// otherwise the error is returned.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetcher: F,
        ttl: Duration,
    ) -> Result<Arc<Payload>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload, E>>,
        E: Into<BoxError>,
    {
        self.lookup(key, fetcher, ttl)
            .await
            .map(CacheLookup::into_value)
    }

    /// Same as [`get_or_fetch`](Self::get_or_fetch) with the configured
    /// default TTL.
    pub async fn get_or_fetch_default<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetcher: F,
    ) -> Result<Arc<Payload>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload, E>>,
        E: Into<BoxError>,
    {
        self.get_or_fetch(key, fetcher, self.config.default_ttl())
            .await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but reports the origin
    /// of the value.
    pub async fn lookup<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetcher: F,
        ttl: Duration,
    ) -> Result<CacheLookup, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload, E>>,
        E: Into<BoxError>,
    {
        let start = StdInstant::now();

        if let Some(entry) = self.fresh_entry(key, ttl).await {
            self.metrics.record_hit();
            self.metrics
                .record_operation_duration("lookup_hit", start.elapsed());
            return Ok(CacheLookup::new(entry.shared_value(), Origin::Fresh));
        }

        let flight = if self.config.single_flight {
            Some(self.acquire_flight(key).await)
        } else {
            None
        };

        // Otra tarea pudo refrescar la key mientras esperabamos el lock
        if flight.is_some()
            && let Some(entry) = self.fresh_entry(key, ttl).await
        {
            self.metrics.record_hit();
            self.metrics
                .record_operation_duration("lookup_hit", start.elapsed());
            return Ok(CacheLookup::new(entry.shared_value(), Origin::Fresh));
        }

        let previous = self.inner.get(key).await;

        if previous.is_none()
            && let Some(value) = self.read_durable(key, ttl).await
        {
            self.metrics.record_durable_hit();
            self.metrics
                .record_operation_duration("lookup_durable", start.elapsed());
            self.update_entry_gauge();
            return Ok(CacheLookup::new(value, Origin::Durable));
        }

        self.metrics.record_miss();

        let lookup = match fetcher().await {
            Ok(value) => {
                let value = Arc::new(value);
                self.store_entry(key, Arc::clone(&value), ttl).await;
                self.persist(key, &value).await;
                debug!(key = %key, "Fetched and cached");
                CacheLookup::new(value, Origin::Fetched)
            },
            Err(err) => {
                let err: BoxError = err.into();
                self.metrics.record_fetch_failure();

                match previous {
                    Some(entry) => {
                        warn!(
                            key = %key,
                            error = %err,
                            age_secs = entry.age().as_secs(),
                            "Fetch failed, serving previous value"
                        );
                        self.metrics.record_stale_served();
                        CacheLookup::new(
                            entry.shared_value(),
                            Origin::Stale {
                                reason: err.to_string(),
                            },
                        )
                    },
                    None => {
                        warn!(key = %key, error = %err, "Fetch failed with nothing cached");
                        return Err(CacheError::fetch(key.clone(), err));
                    },
                }
            },
        };

        drop(flight);

        self.metrics
            .record_operation_duration("lookup_miss", start.elapsed());
        self.update_entry_gauge();

        Ok(lookup)
    }

    /// Returns the current entry for `key` regardless of age. Never fetches.
    pub async fn peek(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.inner.get(key).await
    }

    /// Stores `value` under `key` as if it had just been fetched.
    pub async fn insert(&self, key: CacheKey, value: Payload, ttl: Duration) {
        self.store_entry(&key, Arc::new(value), ttl).await;
        self.update_entry_gauge();
    }

    /// Returns true if `key` has a write policy and a store to apply it to.
    pub fn is_durable(&self, key: &CacheKey) -> bool {
        self.store.is_some() && self.policies.contains_key(key)
    }

    /// Returns the durable store, if one is attached.
    pub fn durable_store(&self) -> Option<&Arc<dyn DurableStore>> {
        self.store.as_ref()
    }

    /// Returns the default TTL.
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl()
    }

    /// Retorna el numero aproximado de entries en cache.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Retorna las metricas para acceso externo.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    async fn fresh_entry(&self, key: &CacheKey, ttl: Duration) -> Option<Arc<CacheEntry>> {
        self.inner
            .get(key)
            .await
            .filter(|entry| entry.is_fresh_for(ttl))
    }

    async fn store_entry(&self, key: &CacheKey, value: Arc<Payload>, ttl: Duration) {
        let entry = CacheEntry::new(key.clone(), value, ttl);
        self.inner.insert(key.clone(), Arc::new(entry)).await;
    }

    async fn acquire_flight(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut flights = self.flights.lock();
            Arc::clone(flights.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Reads a recent durable record and promotes it into memory.
    ///
    /// Read errors count as absence.
    async fn read_durable(&self, key: &CacheKey, ttl: Duration) -> Option<Arc<Payload>> {
        // TTL cero fuerza el fetch
        if ttl.is_zero() {
            return None;
        }
        let policy = self.policies.get(key)?;
        let store = self.store.as_ref()?;

        let record = match store.read(key).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, store = store.name(), error = %err, "Durable read failed");
                return None;
            },
        };

        let age = record.age(Utc::now());
        if age >= policy.max_age() {
            debug!(
                key = %key,
                age_secs = age.as_secs(),
                "Durable record too old, fetching"
            );
            return None;
        }

        let value = Arc::new(record.into_value());
        // La entrada conserva la edad real del registro durable
        match promoted_fetched_at(Instant::now(), age, ttl) {
            Some(fetched_at) => {
                let entry =
                    CacheEntry::with_fetched_at(key.clone(), Arc::clone(&value), ttl, fetched_at);
                self.inner.insert(key.clone(), Arc::new(entry)).await;
            },
            None => debug!(key = %key, "Durable record served without promotion"),
        }

        debug!(key = %key, age_secs = age.as_secs(), "Served from durable store");
        Some(value)
    }

    /// Writes an accepted fetch result to the durable store.
    ///
    /// Write errors are logged and never reach the caller.
    async fn persist(&self, key: &CacheKey, value: &Payload) {
        let (Some(policy), Some(store)) = (self.policies.get(key), self.store.as_ref()) else {
            return;
        };

        if !policy.accepts(value) {
            debug!(key = %key, "Write policy rejected value, not persisting");
            return;
        }

        if let Err(err) = store.write(key, value).await {
            self.metrics.record_durable_write_failure();
            warn!(key = %key, store = store.name(), error = %err, "Durable write failed");
        }
    }

    /// Actualiza el gauge de entry count.
    fn update_entry_gauge(&self) {
        self.metrics.update_entry_count(self.inner.entry_count());
    }

    /// Sincroniza el cache (para tests principalmente).
    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

/// Backdates a promoted durable record by its age, capped at `ttl`.
///
/// `None` when the clock cannot go back that far; the record is then served
/// without entering memory.
fn promoted_fetched_at(now: Instant, age: Duration, ttl: Duration) -> Option<Instant> {
    now.checked_sub(age.min(ttl))
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("config", &self.config)
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .field("policies", &self.policies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoredRecord};
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name).unwrap()
    }

    fn failure() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "api down")
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_within_ttl_uses_cache() {
        let cache = FetchCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let ttl = Duration::from_secs(60);

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let value = cache
                .get_or_fetch(
                    &key("network_stats"),
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, io::Error>(json!({"transactions": 100}))
                    },
                    ttl,
                )
                .await
                .unwrap();
            assert_eq!(value["transactions"], 100);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics().hits(), 1);
        assert_eq!(cache.metrics().misses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_after_ttl() {
        let cache = FetchCache::new(CacheConfig::default());
        let ttl = Duration::from_secs(60);

        let first = cache
            .lookup(&key("k"), || async { Ok::<_, io::Error>(json!(1)) }, ttl)
            .await
            .unwrap();
        assert_eq!(first.origin(), &Origin::Fetched);

        tokio::time::advance(Duration::from_secs(60)).await;

        let second = cache
            .lookup(&key("k"), || async { Ok::<_, io::Error>(json!(2)) }, ttl)
            .await
            .unwrap();
        assert_eq!(second.origin(), &Origin::Fetched);
        assert_eq!(second.value(), &json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_previous_value() {
        let cache = FetchCache::new(CacheConfig::default());
        let ttl = Duration::from_secs(10);

        cache
            .get_or_fetch(&key("market_data"), || async { Ok::<_, io::Error>(json!({"price": 30})) }, ttl)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        let lookup = cache
            .lookup(&key("market_data"), || async { Err::<Payload, _>(failure()) }, ttl)
            .await
            .unwrap();

        assert!(lookup.is_stale());
        assert_eq!(lookup.stale_reason(), Some("api down"));
        assert_eq!(lookup.value(), &json!({"price": 30}));
        assert_eq!(cache.metrics().stale_served(), 1);
    }

    #[tokio::test]
    async fn test_failure_without_previous_value_propagates() {
        let cache = FetchCache::new(CacheConfig::default());

        let err = cache
            .get_or_fetch_default(&key("volume_data"), || async { Err::<Payload, _>(failure()) })
            .await
            .unwrap_err();

        assert_eq!(err.key().as_str(), "volume_data");
        assert!(cache.peek(&key("volume_data")).await.is_none());
        assert_eq!(cache.metrics().fetch_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_kept_after_failure() {
        let cache = FetchCache::new(CacheConfig::default());
        let ttl = Duration::from_secs(5);

        cache.insert(key("k"), json!("old"), ttl).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(&key("k"), || async { Err::<Payload, _>(failure()) }, ttl)
                .await
                .unwrap();
            assert_eq!(*value, json!("old"));
        }

        let entry = cache.peek(&key("k")).await.unwrap();
        assert_eq!(entry.value(), &json!("old"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = FetchCache::new(CacheConfig::default());
        let ttl = Duration::from_secs(60);

        cache.insert(key("a"), json!("a"), ttl).await;
        let b = cache
            .get_or_fetch(&key("b"), || async { Ok::<_, io::Error>(json!("b")) }, ttl)
            .await
            .unwrap();

        assert_eq!(*b, json!("b"));
        assert_eq!(cache.peek(&key("a")).await.unwrap().value(), &json!("a"));
        cache.sync().await;
        assert_eq!(cache.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_durable_record_skips_fetcher() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(StoredRecord::new(
            key("binance_wallet"),
            json!({"balance": 900}),
            Utc::now() - chrono::Duration::minutes(2),
        ));

        let cache = FetchCache::builder(CacheConfig::default())
            .durable_store(store.clone())
            .policy(
                key("binance_wallet"),
                WritePolicy::positive_field(Duration::from_secs(600), "balance"),
            )
            .build();

        let lookup = cache
            .lookup(
                &key("binance_wallet"),
                || async { Err::<Payload, _>(failure()) },
                Duration::from_secs(300),
            )
            .await
            .unwrap();

        assert_eq!(lookup.origin(), &Origin::Durable);
        assert_eq!(lookup.value()["balance"], 900);
        assert!(cache.peek(&key("binance_wallet")).await.is_some());
    }

    #[tokio::test]
    async fn test_old_durable_record_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(StoredRecord::new(
            key("bybit_wallet"),
            json!({"balance": 1}),
            Utc::now() - chrono::Duration::minutes(30),
        ));

        let cache = FetchCache::builder(CacheConfig::default())
            .durable_store(store)
            .policy(key("bybit_wallet"), WritePolicy::new(Duration::from_secs(600)))
            .build();

        let lookup = cache
            .lookup(
                &key("bybit_wallet"),
                || async { Ok::<_, io::Error>(json!({"balance": 2})) },
                Duration::from_secs(300),
            )
            .await
            .unwrap();

        assert_eq!(lookup.origin(), &Origin::Fetched);
        assert_eq!(lookup.value()["balance"], 2);
    }

    #[tokio::test]
    async fn test_policy_controls_persistence() {
        let store = Arc::new(MemoryStore::new());
        let cache = FetchCache::builder(CacheConfig::default())
            .durable_store(store.clone())
            .policy(
                key("mexc_wallet"),
                WritePolicy::positive_field(Duration::from_secs(600), "balance"),
            )
            .build();
        let ttl = Duration::from_secs(300);

        cache
            .get_or_fetch(&key("mexc_wallet"), || async { Ok::<_, io::Error>(json!({"balance": 0})) }, ttl)
            .await
            .unwrap();
        assert!(store.is_empty(), "zero balance must not be persisted");

        cache
            .get_or_fetch(&key("other"), || async { Ok::<_, io::Error>(json!({"balance": 5})) }, ttl)
            .await
            .unwrap();
        assert!(store.is_empty(), "keys without a policy never persist");
        assert!(cache.is_durable(&key("mexc_wallet")));
        assert!(!cache.is_durable(&key("other")));
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_with_single_flight() {
        let config = CacheConfig {
            single_flight: true,
            ..CacheConfig::default()
        };
        let cache = Arc::new(FetchCache::new(config));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..50 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(
                        &key("recent_transactions"),
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok::<_, io::Error>(json!([]))
                        },
                        Duration::from_secs(60),
                    )
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_promoted_age_is_capped_at_ttl() {
        let now = Instant::now();
        let ttl = Duration::from_secs(60);

        let fetched_at = promoted_fetched_at(now, Duration::from_secs(3600), ttl).unwrap();
        assert_eq!(now - fetched_at, ttl);

        let recent = promoted_fetched_at(now, Duration::from_secs(10), ttl).unwrap();
        assert_eq!(now - recent, Duration::from_secs(10));

        assert!(promoted_fetched_at(now, Duration::MAX, Duration::MAX).is_none());
    }

    #[tokio::test]
    async fn test_durable_record_older_than_ttl_is_not_fresh_in_memory() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(StoredRecord::new(
            key("kucoin_wallet"),
            json!({"balance": 5}),
            Utc::now() - chrono::Duration::minutes(5),
        ));

        let cache = FetchCache::builder(CacheConfig::default())
            .durable_store(store)
            .policy(
                key("kucoin_wallet"),
                WritePolicy::new(Duration::from_secs(600)),
            )
            .build();
        let ttl = Duration::from_secs(60);

        let first = cache
            .lookup(&key("kucoin_wallet"), || async { Err::<Payload, _>(failure()) }, ttl)
            .await
            .unwrap();
        assert_eq!(first.origin(), &Origin::Durable);

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let second = cache
            .lookup(
                &key("kucoin_wallet"),
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, io::Error>(json!({"balance": 6}))
                },
                ttl,
            )
            .await
            .unwrap();

        assert_eq!(second.origin(), &Origin::Fetched);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
