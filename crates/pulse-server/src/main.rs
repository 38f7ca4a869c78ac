//! Pulse dashboard server binary.

use std::sync::Arc;

use anyhow::Context;
use pulse_cache::{DurableStore, MemoryStore, SqliteStore};
use pulse_sampler::RateSampler;
use pulse_server::{AppState, Settings, Sources, WalletWarmer, create_router, serve};
use pulse_sources::{CoinMarketCapClient, MultiversxClient};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("failed to load settings")?;
    let addr = settings
        .server
        .socket_addr()
        .context("invalid server.host/server.port")?;

    tracing::info!("Starting Pulse server v{}", env!("CARGO_PKG_VERSION"));

    let prometheus =
        pulse_server::metrics::init_metrics().context("failed to install metrics recorder")?;

    let multiversx = Arc::new(
        MultiversxClient::new(settings.multiversx.clone())
            .context("failed to build MultiversX client")?,
    );
    let coinmarketcap = Arc::new(
        CoinMarketCapClient::new(settings.coinmarketcap.clone())
            .context("failed to build CoinMarketCap client")?,
    );

    let store: Option<Arc<dyn DurableStore>> = if !settings.durable.enabled {
        None
    } else if let Some(path) = settings.durable.sqlite_path() {
        let store = SqliteStore::open(path)
            .with_context(|| format!("failed to open durable store at {}", path.display()))?;
        Some(Arc::new(store) as Arc<dyn DurableStore>)
    } else {
        Some(Arc::new(MemoryStore::new()) as Arc<dyn DurableStore>)
    };

    let sampler = Arc::new(RateSampler::new(
        multiversx.clone(),
        settings.sampler.clone(),
    ));

    let state = AppState::from_settings(
        &settings,
        Sources::new(multiversx, coinmarketcap),
        store,
        Arc::clone(&sampler),
    )?;

    // Primer valor antes de aceptar requests
    if let Err(e) = sampler.sample_once().await {
        tracing::warn!(error = %e, "Initial rate sample failed, starting at 0");
    }
    sampler.start();

    let warmer = WalletWarmer::new(
        state.datasets().clone(),
        settings.wallets.clone(),
        settings.warmer.clone(),
    );
    if settings.warmer.enabled {
        warmer.start();
    }

    let result = serve(addr, create_router(state, prometheus)).await;

    warmer.stop().await;
    sampler.stop().await;

    result.context("server error")
}
