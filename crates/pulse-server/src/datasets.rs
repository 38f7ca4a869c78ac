//! Dashboard datasets and how each one is loaded.
//!
//! A [`Dataset`] names one cached value: its cache key, its TTL and the
//! remote call that produces it. [`DatasetLoader`] runs those calls through
//! the shared [`FetchCache`].

use std::sync::Arc;
use std::time::Duration;

use pulse_cache::{BoxError, CacheError, CacheLookup, FetchCache};
use pulse_core::{CacheKey, Payload, Timeframe};
use pulse_sources::{MarketApi, NetworkApi};
use serde::Serialize;
use tracing::debug;

use crate::settings::{TtlSettings, WalletConfig};

/// A dataset served by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    NetworkStats,
    StakingStats,
    MarketData,
    PriceHistory(Timeframe),
    ExchangeVolumes,
    RecentTransactions,
    Wallet { name: String, address: String },
}

impl Dataset {
    pub fn wallet(wallet: &WalletConfig) -> Self {
        Dataset::Wallet {
            name: wallet.name.clone(),
            address: wallet.address.clone(),
        }
    }

    /// Cache key of this dataset.
    pub fn key(&self) -> pulse_core::Result<CacheKey> {
        match self {
            Dataset::NetworkStats => CacheKey::new("network_stats"),
            Dataset::StakingStats => CacheKey::new("staking_stats"),
            Dataset::MarketData => CacheKey::new("market_data"),
            Dataset::PriceHistory(timeframe) => Ok(CacheKey::price_history(*timeframe)),
            Dataset::ExchangeVolumes => CacheKey::new("volume_data"),
            Dataset::RecentTransactions => CacheKey::new("recent_transactions"),
            Dataset::Wallet { name, .. } => CacheKey::wallet(name),
        }
    }

    /// Freshness window of this dataset.
    pub fn ttl(&self, ttl: &TtlSettings) -> Duration {
        let secs = match self {
            Dataset::NetworkStats => ttl.network_stats,
            Dataset::StakingStats => ttl.staking_stats,
            Dataset::MarketData => ttl.market_data,
            Dataset::PriceHistory(_) => ttl.price_data,
            Dataset::ExchangeVolumes => ttl.volume_data,
            Dataset::RecentTransactions => ttl.recent_transactions,
            Dataset::Wallet { .. } => ttl.wallets,
        };
        Duration::from_secs(secs)
    }
}

/// Remote clients behind the datasets.
#[derive(Clone)]
pub struct Sources {
    network: Arc<dyn NetworkApi>,
    market: Arc<dyn MarketApi>,
}

impl Sources {
    pub fn new(network: Arc<dyn NetworkApi>, market: Arc<dyn MarketApi>) -> Self {
        Self { network, market }
    }

    /// Calls the remote API for `dataset` and encodes the result.
    pub async fn load(&self, dataset: &Dataset) -> Result<Payload, BoxError> {
        match dataset {
            Dataset::NetworkStats => encode(self.network.network_stats().await?),
            Dataset::StakingStats => encode(self.network.staking_stats().await?),
            Dataset::MarketData => encode(self.market.market_data().await?),
            Dataset::PriceHistory(timeframe) => {
                encode(self.market.price_history(*timeframe).await?)
            },
            Dataset::ExchangeVolumes => encode(self.market.exchange_volumes().await?),
            Dataset::RecentTransactions => encode(self.network.recent_transactions().await?),
            Dataset::Wallet { address, .. } => encode(self.network.wallet(address).await?),
        }
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("network", &self.network.name())
            .field("market", &self.market.name())
            .finish()
    }
}

fn encode<T: Serialize>(value: T) -> Result<Payload, BoxError> {
    Ok(serde_json::to_value(value)?)
}

/// Loads datasets through the fetch cache.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    cache: FetchCache,
    sources: Sources,
    ttl: TtlSettings,
}

/// Failure to load a dataset.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Key(#[from] pulse_core::PulseError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl DatasetLoader {
    pub fn new(cache: FetchCache, sources: Sources, ttl: TtlSettings) -> Self {
        Self {
            cache,
            sources,
            ttl,
        }
    }

    /// Returns `dataset`, from cache while it is fresh.
    pub async fn lookup(&self, dataset: &Dataset) -> Result<(CacheKey, CacheLookup), LoadError> {
        let ttl = dataset.ttl(&self.ttl);
        self.lookup_with_ttl(dataset, ttl).await
    }

    /// Fetches `dataset` regardless of the cached entry's age.
    ///
    /// The previous value is still served if the fetch fails.
    pub async fn refresh(&self, dataset: &Dataset) -> Result<(CacheKey, CacheLookup), LoadError> {
        self.lookup_with_ttl(dataset, Duration::ZERO).await
    }

    async fn lookup_with_ttl(
        &self,
        dataset: &Dataset,
        ttl: Duration,
    ) -> Result<(CacheKey, CacheLookup), LoadError> {
        let key = dataset.key()?;
        let lookup = self
            .cache
            .lookup(&key, || self.sources.load(dataset), ttl)
            .await?;

        debug!(key = %key, origin = lookup.origin().label(), "Dataset loaded");
        Ok((key, lookup))
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn ttl(&self) -> &TtlSettings {
        &self.ttl
    }
}
