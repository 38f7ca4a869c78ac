//! In-process stand-ins for the remote APIs.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pulse_core::{BlockRecord, ShardId, Timeframe};
use pulse_sampler::{BlockSource, SampleError};
use pulse_sources::{
    Direction, ExchangeVolume, MarketApi, MarketData, NetworkApi, NetworkStats, PricePoint,
    SourceError, StakingStats, TransactionSummary, Transfer, WalletSnapshot,
};

pub const BINANCE: &str = "erd1binance";
pub const KRAKEN: &str = "erd1kraken";

/// Network API with canned answers and a failure switch.
#[derive(Default)]
pub struct StubNetwork {
    failing: AtomicBool,
    failing_wallets: Mutex<HashSet<String>>,
    calls: AtomicU32,
}

impl StubNetwork {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_wallet(&self, address: &str) {
        self.failing_wallets
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, endpoint: &str) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::status(endpoint, 503));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkApi for StubNetwork {
    async fn network_stats(&self) -> Result<NetworkStats, SourceError> {
        self.enter("/stats")?;
        Ok(NetworkStats {
            transactions: 450_000_000,
            active_addresses: 2_900_000,
            epoch: 1500,
            shards: 3,
        })
    }

    async fn staking_stats(&self) -> Result<StakingStats, SourceError> {
        self.enter("/stake")?;
        Ok(StakingStats {
            total_validators: 3200,
            active_validators: 3150,
            total_observers: 12,
            total_staked: 14_500_000.0,
            nakamoto_coefficient: 28,
        })
    }

    async fn recent_transactions(&self) -> Result<Vec<TransactionSummary>, SourceError> {
        self.enter("/transactions")?;
        Ok(vec![TransactionSummary {
            hash: "tx1".into(),
            from: BINANCE.into(),
            to: KRAKEN.into(),
            amount: 5.0,
            timestamp: Utc::now(),
        }])
    }

    async fn wallet(&self, address: &str) -> Result<WalletSnapshot, SourceError> {
        self.enter("/accounts/{address}")?;
        if self.failing_wallets.lock().unwrap().contains(address) {
            return Err(SourceError::status("/accounts/{address}", 502));
        }

        let (balance, transfers) = match address {
            BINANCE => (
                300.0,
                vec![
                    Transfer {
                        hash: "in".into(),
                        counterparty: "erd1user".into(),
                        value: 10.0,
                        direction: Direction::Incoming,
                        timestamp: Utc::now() - Duration::hours(1),
                    },
                    Transfer {
                        hash: "old".into(),
                        counterparty: "erd1user".into(),
                        value: 99.0,
                        direction: Direction::Outgoing,
                        timestamp: Utc::now() - Duration::days(3),
                    },
                ],
            ),
            KRAKEN => (100.0, vec![]),
            _ => (0.0, vec![]),
        };

        Ok(WalletSnapshot::new(address, balance, transfers))
    }

    fn name(&self) -> &str {
        "stub-network"
    }
}

/// Market API with canned answers and a failure switch.
#[derive(Default)]
pub struct StubMarket {
    failing: AtomicBool,
    calls: AtomicU32,
}

impl StubMarket {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, endpoint: &str) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::status(endpoint, 500));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketApi for StubMarket {
    async fn market_data(&self) -> Result<MarketData, SourceError> {
        self.enter("quotes/latest")?;
        Ok(MarketData {
            price: 31.4,
            volume_24h: 18_500_000.0,
            market_cap: 864_000_000.0,
            circulating_supply: 27_500_000.0,
            percent_change_24h: -2.1,
        })
    }

    async fn price_history(&self, timeframe: Timeframe) -> Result<Vec<PricePoint>, SourceError> {
        self.enter("quotes/historical")?;
        let now = Utc::now();
        Ok((0..timeframe.days())
            .rev()
            .map(|days_ago| PricePoint {
                timestamp: now - Duration::days(days_ago as i64),
                price: 30.0 + days_ago as f64,
                volume_24h: 1.0,
                market_cap: 2.0,
            })
            .collect())
    }

    async fn exchange_volumes(&self) -> Result<Vec<ExchangeVolume>, SourceError> {
        self.enter("market-pairs/latest")?;
        Ok(vec![ExchangeVolume {
            exchange: "Binance".into(),
            pair: "EGLD/USDT".into(),
            volume_24h: 9_000_000.0,
            price: 31.4,
        }])
    }

    fn name(&self) -> &str {
        "stub-market"
    }
}

/// Block source returning three shards worth 37 transactions.
pub struct StubBlocks;

#[async_trait]
impl BlockSource for StubBlocks {
    async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError> {
        Ok(vec![
            BlockRecord::new(ShardId(0), 1, 10),
            BlockRecord::new(ShardId(0), 2, 20),
            BlockRecord::new(ShardId(0), 3, 30),
            BlockRecord::new(ShardId(1), 1, 5),
            BlockRecord::new(ShardId(1), 2, 7),
        ])
    }

    fn name(&self) -> &str {
        "stub-blocks"
    }
}
