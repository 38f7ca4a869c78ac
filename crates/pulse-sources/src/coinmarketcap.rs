//! CoinMarketCap pro API client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::Timeframe;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::MarketApi;
use crate::error::SourceError;
use crate::http::{build_client, flexible_f64, get_json, join};
use crate::model::{ExchangeVolume, MarketData, PricePoint};

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Settings for [`CoinMarketCapClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoinMarketCapConfig {
    /// API root (default: `https://pro-api.coinmarketcap.com/v1`).
    pub base_url: String,
    /// Pro API key. Requests are sent without it when unset.
    pub api_key: Option<String>,
    /// CoinMarketCap id of the tracked asset (EGLD is `6892`).
    pub asset_id: String,
    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pro-api.coinmarketcap.com/v1".to_string(),
            api_key: None,
            asset_id: "6892".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct UsdQuote {
    #[serde(default, deserialize_with = "flexible_f64")]
    price: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    volume_24h: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    market_cap: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    percent_change_24h: f64,
}

#[derive(Debug, Deserialize)]
struct Quotes {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(default, deserialize_with = "flexible_f64")]
    circulating_supply: f64,
    quote: Quotes,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    quotes: Vec<RawHistoricalQuote>,
}

#[derive(Debug, Deserialize)]
struct RawHistoricalQuote {
    timestamp: DateTime<Utc>,
    quote: Quotes,
}

#[derive(Debug, Deserialize)]
struct RawPairs {
    #[serde(default)]
    market_pairs: Vec<RawMarketPair>,
}

#[derive(Debug, Deserialize)]
struct RawMarketPair {
    exchange: RawExchange,
    #[serde(default)]
    market_pair: String,
    quote: Quotes,
}

#[derive(Debug, Deserialize)]
struct RawExchange {
    name: String,
}

/// Client for the CoinMarketCap pro API.
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    client: Client,
    config: CoinMarketCapConfig,
}

impl CoinMarketCapClient {
    /// Creates a client from `config`.
    pub fn new(config: CoinMarketCapConfig) -> Result<Self, SourceError> {
        let client = build_client(Duration::from_secs(config.request_timeout_seconds))?;

        if config.api_key.is_none() {
            warn!("No CoinMarketCap API key configured; market requests will be rejected");
        }
        info!(base_url = %config.base_url, asset_id = %config.asset_id, "CoinMarketCap client ready");

        Ok(Self { client, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CoinMarketCapConfig {
        &self.config
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(join(&self.config.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json");

        match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

#[async_trait]
impl MarketApi for CoinMarketCapClient {
    async fn market_data(&self) -> Result<MarketData, SourceError> {
        let endpoint = "cryptocurrency/quotes/latest";
        let request = self.get(endpoint).query(&[("id", &self.config.asset_id)]);
        let mut envelope: Envelope<HashMap<String, RawAsset>> = get_json(request, endpoint).await?;

        let asset = envelope
            .data
            .remove(&self.config.asset_id)
            .ok_or_else(|| SourceError::missing(endpoint, format!("data.{}", self.config.asset_id)))?;
        let usd = asset.quote.usd;

        Ok(MarketData {
            price: usd.price,
            volume_24h: usd.volume_24h,
            market_cap: usd.market_cap,
            circulating_supply: asset.circulating_supply,
            percent_change_24h: usd.percent_change_24h,
        })
    }

    async fn price_history(&self, timeframe: Timeframe) -> Result<Vec<PricePoint>, SourceError> {
        let endpoint = "cryptocurrency/quotes/historical";
        let request = self.get(endpoint).query(&[
            ("id", self.config.asset_id.clone()),
            ("interval", timeframe.interval().to_string()),
            ("count", timeframe.days().to_string()),
        ]);
        let envelope: Envelope<RawHistory> = get_json(request, endpoint).await?;

        let mut points: Vec<PricePoint> = envelope
            .data
            .quotes
            .into_iter()
            .map(|q| PricePoint {
                timestamp: q.timestamp,
                price: q.quote.usd.price,
                volume_24h: q.quote.usd.volume_24h,
                market_cap: q.quote.usd.market_cap,
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        Ok(points)
    }

    async fn exchange_volumes(&self) -> Result<Vec<ExchangeVolume>, SourceError> {
        let endpoint = "cryptocurrency/market-pairs/latest";
        let request = self.get(endpoint).query(&[("id", &self.config.asset_id)]);
        let envelope: Envelope<RawPairs> = get_json(request, endpoint).await?;

        Ok(envelope
            .data
            .market_pairs
            .into_iter()
            .map(|pair| ExchangeVolume {
                exchange: pair.exchange.name,
                pair: pair.market_pair,
                volume_24h: pair.quote.usd.volume_24h,
                price: pair.quote.usd.price,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "coinmarketcap"
    }
}
