//! # Pulse Sources
//!
//! HTTP clients for the remote APIs behind the dashboard.
//!
//! - [`MultiversxClient`]: network stats, staking, transactions, exchange
//!   wallets and the block window used by the rate sampler
//! - [`CoinMarketCapClient`]: quotes, price history and exchange volumes
//!
//! Both are reached through the [`NetworkApi`] and [`MarketApi`] traits so
//! the server can be tested against stubs.

pub mod api;
pub mod coinmarketcap;
pub mod error;
mod http;
pub mod model;
pub mod multiversx;

// Re-exports
pub use api::{MarketApi, NetworkApi};
pub use coinmarketcap::{CoinMarketCapClient, CoinMarketCapConfig};
pub use error::SourceError;
pub use model::{
    DailyFlow, Direction, ExchangeVolume, MarketData, NetworkStats, PricePoint, StakingStats,
    TransactionSummary, Transfer, WalletSnapshot,
};
pub use multiversx::{MultiversxClient, MultiversxConfig};
