//! Client traits.

use async_trait::async_trait;
use pulse_core::Timeframe;

use crate::error::SourceError;
use crate::model::{
    ExchangeVolume, MarketData, NetworkStats, PricePoint, StakingStats, TransactionSummary,
    WalletSnapshot,
};

/// On-chain data: network counters, staking, transactions and wallets.
///
/// # Implementors
///
/// - `MultiversxClient` - the public MultiversX API
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Fetches network-wide counters.
    async fn network_stats(&self) -> Result<NetworkStats, SourceError>;

    /// Fetches validator and staking figures.
    async fn staking_stats(&self) -> Result<StakingStats, SourceError>;

    /// Fetches the latest transactions on the network.
    async fn recent_transactions(&self) -> Result<Vec<TransactionSummary>, SourceError>;

    /// Fetches balance and recent transfers of `address`.
    async fn wallet(&self, address: &str) -> Result<WalletSnapshot, SourceError>;

    /// Returns the name of this client, used in logs.
    fn name(&self) -> &str;
}

/// Market data: quotes, price history and exchange volumes.
///
/// # Implementors
///
/// - `CoinMarketCapClient` - the CoinMarketCap pro API
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Fetches the current quote.
    async fn market_data(&self) -> Result<MarketData, SourceError>;

    /// Fetches the price history for `timeframe`, oldest point first.
    async fn price_history(&self, timeframe: Timeframe) -> Result<Vec<PricePoint>, SourceError>;

    /// Fetches 24h volume per exchange pair.
    async fn exchange_volumes(&self) -> Result<Vec<ExchangeVolume>, SourceError>;

    /// Returns the name of this client, used in logs.
    fn name(&self) -> &str;
}
