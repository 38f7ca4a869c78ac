//! MultiversX public API client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::BlockRecord;
use pulse_sampler::{BlockSource, SampleError};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::NetworkApi;
use crate::error::SourceError;
use crate::http::{build_client, flexible_f64, get_json, join};
use crate::model::{
    Direction, NetworkStats, StakingStats, TransactionSummary, Transfer, WalletSnapshot, to_egld,
};

/// Settings for [`MultiversxClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MultiversxConfig {
    /// API root (default: `https://api.multiversx.com`).
    pub base_url: String,
    /// Separate root for `/blocks`; falls back to `base_url`.
    pub blocks_base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,
    /// Number of network transactions listed.
    pub transactions_page_size: usize,
    /// Number of transfers fetched per wallet.
    pub transfers_page_size: usize,
    /// Number of blocks in one sampling window.
    pub blocks_page_size: usize,
}

impl Default for MultiversxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.multiversx.com".to_string(),
            blocks_base_url: None,
            request_timeout_seconds: 10,
            transactions_page_size: 10,
            transfers_page_size: 50,
            blocks_page_size: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStats {
    #[serde(default)]
    accounts: u64,
    #[serde(default)]
    transactions: u64,
    #[serde(default)]
    epoch: u64,
    #[serde(default)]
    shards: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStake {
    #[serde(default)]
    total_validators: u64,
    #[serde(default)]
    active_validators: u64,
    #[serde(default)]
    total_observers: u64,
    #[serde(default, deserialize_with = "flexible_f64")]
    total_staked: f64,
    #[serde(default, alias = "nakamotoIndex")]
    nakamoto_coefficient: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    tx_hash: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    receiver: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    value: f64,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default, deserialize_with = "flexible_f64")]
    balance: f64,
}

fn timestamp(endpoint: &str, secs: i64) -> Result<DateTime<Utc>, SourceError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SourceError::decode(endpoint, format!("invalid timestamp {}", secs)))
}

impl RawTransaction {
    fn into_summary(self, endpoint: &str) -> Result<TransactionSummary, SourceError> {
        Ok(TransactionSummary {
            timestamp: timestamp(endpoint, self.timestamp)?,
            hash: self.tx_hash,
            from: self.sender,
            to: self.receiver,
            amount: to_egld(self.value),
        })
    }

    /// Direction and counterparty are taken relative to `wallet`.
    fn into_transfer(self, endpoint: &str, wallet: &str) -> Result<Transfer, SourceError> {
        let (direction, counterparty) = if self.receiver == wallet {
            (Direction::Incoming, self.sender)
        } else {
            (Direction::Outgoing, self.receiver)
        };

        Ok(Transfer {
            timestamp: timestamp(endpoint, self.timestamp)?,
            hash: self.tx_hash,
            counterparty,
            value: to_egld(self.value),
            direction,
        })
    }
}

/// Client for the MultiversX API.
///
/// Implements [`NetworkApi`] for dashboard datasets and [`BlockSource`]
/// for the rate sampler.
#[derive(Debug, Clone)]
pub struct MultiversxClient {
    client: Client,
    config: MultiversxConfig,
}

impl MultiversxClient {
    /// Creates a client from `config`.
    pub fn new(config: MultiversxConfig) -> Result<Self, SourceError> {
        let client = build_client(Duration::from_secs(config.request_timeout_seconds))?;

        info!(base_url = %config.base_url, "MultiversX client ready");

        Ok(Self { client, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MultiversxConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        join(&self.config.base_url, path)
    }

    fn blocks_url(&self) -> String {
        let base = self
            .config
            .blocks_base_url
            .as_deref()
            .unwrap_or(&self.config.base_url);
        join(base, &format!("blocks?size={}", self.config.blocks_page_size))
    }

    /// Fetches the most recent blocks across all shards.
    pub async fn blocks(&self) -> Result<Vec<BlockRecord>, SourceError> {
        get_json(self.client.get(self.blocks_url()), "/blocks").await
    }
}

#[async_trait]
impl NetworkApi for MultiversxClient {
    async fn network_stats(&self) -> Result<NetworkStats, SourceError> {
        let raw: RawStats = get_json(self.client.get(self.url("stats")), "/stats").await?;

        Ok(NetworkStats {
            transactions: raw.transactions,
            active_addresses: raw.accounts,
            epoch: raw.epoch,
            shards: raw.shards,
        })
    }

    async fn staking_stats(&self) -> Result<StakingStats, SourceError> {
        let raw: RawStake = get_json(self.client.get(self.url("stake")), "/stake").await?;

        Ok(StakingStats {
            total_validators: raw.total_validators,
            active_validators: raw.active_validators,
            total_observers: raw.total_observers,
            total_staked: to_egld(raw.total_staked),
            nakamoto_coefficient: raw.nakamoto_coefficient,
        })
    }

    async fn recent_transactions(&self) -> Result<Vec<TransactionSummary>, SourceError> {
        let endpoint = "/transactions";
        let url = self.url(&format!(
            "transactions?size={}",
            self.config.transactions_page_size
        ));
        let raw: Vec<RawTransaction> = get_json(self.client.get(url), endpoint).await?;

        raw.into_iter()
            .map(|tx| tx.into_summary(endpoint))
            .collect()
    }

    async fn wallet(&self, address: &str) -> Result<WalletSnapshot, SourceError> {
        let account_endpoint = "/accounts/{address}";
        let account: RawAccount = get_json(
            self.client.get(self.url(&format!("accounts/{}", address))),
            account_endpoint,
        )
        .await?;

        let transfers_endpoint = "/accounts/{address}/transfers";
        let url = self.url(&format!(
            "accounts/{}/transfers?size={}",
            address, self.config.transfers_page_size
        ));
        let raw: Vec<RawTransaction> = get_json(self.client.get(url), transfers_endpoint).await?;

        let transfers = raw
            .into_iter()
            .map(|tx| tx.into_transfer(transfers_endpoint, address))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(address, transfers = transfers.len(), "Wallet fetched");

        Ok(WalletSnapshot::new(
            address,
            to_egld(account.balance),
            transfers,
        ))
    }

    fn name(&self) -> &str {
        "multiversx"
    }
}

#[async_trait]
impl BlockSource for MultiversxClient {
    async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError> {
        Ok(self.blocks().await?)
    }

    fn name(&self) -> &str {
        "multiversx-blocks"
    }
}
