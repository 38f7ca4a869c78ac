//! Dashboard datasets produced by the clients.
//!
//! These are the shapes stored in the fetch cache (as JSON payloads) and
//! returned by the HTTP API.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Atomic units per EGLD.
pub const DENOMINATION: f64 = 1e18;

/// Converts an atomic amount to EGLD.
pub fn to_egld(atomic: f64) -> f64 {
    atomic / DENOMINATION
}

/// Network-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub transactions: u64,
    pub active_addresses: u64,
    pub epoch: u64,
    pub shards: u32,
}

/// Validator and staking figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingStats {
    pub total_validators: u64,
    pub active_validators: u64,
    pub total_observers: u64,
    /// Total stake in EGLD.
    pub total_staked: f64,
    pub nakamoto_coefficient: u64,
}

/// One entry of the recent transactions list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Amount in EGLD.
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Direction of a transfer relative to the tracked wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// A value transfer touching a tracked wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub hash: String,
    /// The other side of the transfer.
    pub counterparty: String,
    /// Amount in EGLD.
    pub value: f64,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated wallet movement for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub inflow: f64,
    pub outflow: f64,
    pub net: f64,
}

impl DailyFlow {
    /// Groups transfers by UTC day, oldest day first.
    pub fn from_transfers(transfers: &[Transfer]) -> Vec<DailyFlow> {
        let mut days: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

        for transfer in transfers {
            let day = days.entry(transfer.timestamp.date_naive()).or_default();
            match transfer.direction {
                Direction::Incoming => day.0 += transfer.value,
                Direction::Outgoing => day.1 += transfer.value,
            }
        }

        days.into_iter()
            .map(|(date, (inflow, outflow))| DailyFlow {
                date,
                inflow,
                outflow,
                net: inflow - outflow,
            })
            .collect()
    }
}

/// Balance and recent activity of an exchange wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub address: String,
    /// Balance in EGLD.
    pub balance: f64,
    pub transfers: Vec<Transfer>,
    pub daily_flows: Vec<DailyFlow>,
}

impl WalletSnapshot {
    /// Builds a snapshot, deriving daily flows from `transfers`.
    pub fn new(address: impl Into<String>, balance: f64, transfers: Vec<Transfer>) -> Self {
        let daily_flows = DailyFlow::from_transfers(&transfers);
        Self {
            address: address.into(),
            balance,
            transfers,
            daily_flows,
        }
    }

    /// Sums incoming and outgoing value since `since`.
    pub fn flows_since(&self, since: DateTime<Utc>) -> (f64, f64) {
        self.transfers
            .iter()
            .filter(|t| t.timestamp >= since)
            .fold((0.0, 0.0), |(inflow, outflow), t| match t.direction {
                Direction::Incoming => (inflow + t.value, outflow),
                Direction::Outgoing => (inflow, outflow + t.value),
            })
    }
}

/// Current market quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub circulating_supply: f64,
    pub percent_change_24h: f64,
}

/// One point of the price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
}

/// 24h volume of one market pair on one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeVolume {
    pub exchange: String,
    pub pair: String,
    pub volume_24h: f64,
    pub price: f64,
}
