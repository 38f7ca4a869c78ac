//! Test helpers para pulse-server.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod stubs;

use std::sync::Arc;

use pulse_cache::{DurableStore, MemoryStore};
use pulse_sampler::RateSampler;
use pulse_server::{AppState, Settings, Sources, WalletConfig, WalletList, create_router};

pub use client::{TestClient, TestResponse};
pub use stubs::{BINANCE, KRAKEN, StubBlocks, StubMarket, StubNetwork};

/// A router wired to stub APIs, plus handles to steer them.
pub struct TestApp {
    pub client: TestClient,
    pub state: AppState,
    pub network: Arc<StubNetwork>,
    pub market: Arc<StubMarket>,
    pub sampler: Arc<RateSampler>,
    pub store: Arc<MemoryStore>,
}

pub fn test_settings() -> Settings {
    Settings {
        wallets: WalletList::new(vec![
            WalletConfig::new("binance", BINANCE),
            WalletConfig::new("kraken", KRAKEN),
        ]),
        ..Settings::default()
    }
}

pub fn test_app() -> TestApp {
    let settings = test_settings();
    let network = Arc::new(StubNetwork::default());
    let market = Arc::new(StubMarket::default());
    let store = Arc::new(MemoryStore::new());
    let sampler = Arc::new(RateSampler::new(
        Arc::new(StubBlocks),
        settings.sampler.clone(),
    ));

    let state = AppState::from_settings(
        &settings,
        Sources::new(network.clone(), market.clone()),
        Some(store.clone() as Arc<dyn DurableStore>),
        Arc::clone(&sampler),
    )
    .unwrap();

    let prometheus = pulse_server::metrics::test_handle().unwrap();
    let client = TestClient::new(create_router(state.clone(), prometheus));

    TestApp {
        client,
        state,
        network,
        market,
        sampler,
        store,
    }
}

/// Client for tests that only touch stateless behaviour.
pub fn client() -> TestClient {
    test_app().client
}
