//! Application state.

use std::sync::Arc;

use pulse_cache::{CacheConfig, DurableStore, FetchCache, WritePolicy};
use pulse_core::{CacheKey, PulseError};
use pulse_sampler::RateSampler;
use tracing::info;

use crate::datasets::{DatasetLoader, Sources};
use crate::settings::{DurableSettings, Settings, TtlSettings, WalletConfig, WalletList};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    datasets: DatasetLoader,
    sampler: Arc<RateSampler>,
    wallets: Arc<WalletList>,
}

impl AppState {
    pub fn new(datasets: DatasetLoader, sampler: Arc<RateSampler>, wallets: WalletList) -> Self {
        Self {
            datasets,
            sampler,
            wallets: Arc::new(wallets),
        }
    }

    /// Wires the cache and loader from `settings`.
    pub fn from_settings(
        settings: &Settings,
        sources: Sources,
        store: Option<Arc<dyn DurableStore>>,
        sampler: Arc<RateSampler>,
    ) -> Result<Self, PulseError> {
        let cache = build_cache(&settings.cache, &settings.durable, &settings.wallets, store)?;
        let datasets = DatasetLoader::new(cache, sources, settings.ttl.clone());
        Ok(Self::new(datasets, sampler, settings.wallets.clone()))
    }

    pub fn datasets(&self) -> &DatasetLoader {
        &self.datasets
    }

    pub fn cache(&self) -> &FetchCache {
        self.datasets.cache()
    }

    pub fn ttl(&self) -> &TtlSettings {
        self.datasets.ttl()
    }

    pub fn sampler(&self) -> &Arc<RateSampler> {
        &self.sampler
    }

    pub fn wallets(&self) -> &WalletList {
        &self.wallets
    }

    /// Finds a tracked wallet by name.
    pub fn wallet(&self, name: &str) -> Option<&WalletConfig> {
        self.wallets.find(name)
    }
}

/// Builds the fetch cache.
///
/// With a store and durability enabled, every wallet key is backed by the
/// store and only snapshots with a positive balance are persisted.
pub fn build_cache(
    config: &CacheConfig,
    durable: &DurableSettings,
    wallets: &WalletList,
    store: Option<Arc<dyn DurableStore>>,
) -> Result<FetchCache, PulseError> {
    let mut builder = FetchCache::builder(config.clone());

    let Some(store) = store.filter(|_| durable.enabled) else {
        info!("Durable store disabled, wallets are cached in memory only");
        return Ok(builder.build());
    };

    info!(store = store.name(), wallets = wallets.len(), "Wallet keys backed by durable store");
    builder = builder.durable_store(store);
    for wallet in wallets.iter() {
        builder = builder.policy(
            CacheKey::wallet(&wallet.name)?,
            WritePolicy::positive_field(durable.max_age(), "balance"),
        );
    }

    Ok(builder.build())
}
