//! Pulse Server - HTTP API for the dashboard.
//!
//! Serves cached datasets from the MultiversX and CoinMarketCap APIs, the
//! live TPS estimate, health and Prometheus metrics.

pub mod datasets;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod state;
pub mod warmer;

pub use datasets::{Dataset, DatasetLoader, LoadError, Sources};
pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use server::{create_router, serve};
pub use settings::{Settings, WalletConfig, WalletList};
pub use state::{AppState, build_cache};
pub use warmer::{WalletWarmer, WarmReport};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
