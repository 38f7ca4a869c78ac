//! Common type definitions and newtypes for Pulse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

/// Opaque dataset payload produced by a fetcher.
///
/// The cache never looks inside it; only write policies inspect
/// individual fields when deciding whether to persist a value.
pub type Payload = serde_json::Value;

/// Identifier of a logical dataset in the fetch cache.
///
/// Keys are trimmed and must not be empty.
///
/// # Example
///
/// ```
/// use pulse_core::CacheKey;
///
/// let key = CacheKey::new(" market_data ").unwrap();
/// assert_eq!(key.as_str(), "market_data");
///
/// let wallet = CacheKey::wallet("binance").unwrap();
/// assert_eq!(wallet.as_str(), "binance_wallet");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a new key, rejecting empty or whitespace-only values.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let raw = key.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(PulseError::invalid_key(raw, "cannot be empty"));
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(PulseError::invalid_key(
                raw.clone(),
                "cannot contain control characters",
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Key for an exchange wallet snapshot (`{name}_wallet`).
    pub fn wallet(name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(PulseError::invalid_key(name, "wallet name cannot be empty"));
        }
        Self::new(format!("{}_wallet", name.trim()))
    }

    /// Key for price history over a timeframe (`price_data:{timeframe}`).
    pub fn price_history(timeframe: Timeframe) -> Self {
        Self(format!("price_data:{}", timeframe))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = PulseError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = PulseError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Shard (partition) identifier on the MultiversX network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(pub u32);

impl ShardId {
    /// The metachain coordinates the regular shards and has its own id.
    pub const METACHAIN: ShardId = ShardId(u32::MAX);

    /// Returns true for the metachain shard.
    pub fn is_metachain(&self) -> bool {
        *self == Self::METACHAIN
    }
}

impl Default for ShardId {
    fn default() -> Self {
        ShardId(0)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_metachain() {
            write!(f, "metachain")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A single block observation used for throughput sampling.
///
/// Missing numeric fields decode as zero.
///
/// # Example
///
/// ```
/// use pulse_core::{BlockRecord, ShardId};
///
/// let record: BlockRecord =
///     serde_json::from_str(r#"{"shard": 1, "round": 42, "txCount": 7}"#).unwrap();
/// assert_eq!(record.shard, ShardId(1));
/// assert_eq!(record.tx_count, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    /// Partition the block belongs to.
    #[serde(default)]
    pub shard: ShardId,
    /// Ordering field; higher is more recent.
    #[serde(default)]
    pub round: u64,
    /// Number of transactions in the block.
    #[serde(default)]
    pub tx_count: u64,
}

impl BlockRecord {
    /// Creates a new block record.
    pub fn new(shard: ShardId, round: u64, tx_count: u64) -> Self {
        Self {
            shard,
            round,
            tx_count,
        }
    }
}

/// Chart timeframe for price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl Timeframe {
    /// All supported timeframes in display order.
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Day,
        Timeframe::Week,
        Timeframe::Month,
        Timeframe::Quarter,
    ];

    /// Number of days covered.
    pub fn days(&self) -> u32 {
        match self {
            Timeframe::Day => 1,
            Timeframe::Week => 7,
            Timeframe::Month => 30,
            Timeframe::Quarter => 90,
        }
    }

    /// Sampling interval used when querying historical quotes.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Day => "1h",
            _ => "1d",
        }
    }

    /// Returns the short label (`24h`, `7d`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
            Timeframe::Quarter => "90d",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Week
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PulseError::invalid_timeframe(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_trims() {
        let key = CacheKey::new("  network_stats ").unwrap();
        assert_eq!(key.as_str(), "network_stats");
        assert_eq!(key.to_string(), "network_stats");
    }

    #[test]
    fn test_cache_key_rejects_empty() {
        assert!(CacheKey::new("").is_err());
        assert!(CacheKey::new("   ").is_err());
        assert!(CacheKey::new("bad\nkey").is_err());
    }

    #[test]
    fn test_cache_key_helpers() {
        assert_eq!(CacheKey::wallet("kraken").unwrap().as_str(), "kraken_wallet");
        assert!(CacheKey::wallet(" ").is_err());
        assert_eq!(
            CacheKey::price_history(Timeframe::Month).as_str(),
            "price_data:30d"
        );
    }

    #[test]
    fn test_cache_key_serde_validates() {
        let key: CacheKey = serde_json::from_str("\"market_data\"").unwrap();
        assert_eq!(key.as_str(), "market_data");

        let bad: std::result::Result<CacheKey, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_shard_display() {
        assert_eq!(ShardId(2).to_string(), "2");
        assert_eq!(ShardId::METACHAIN.to_string(), "metachain");
        assert!(ShardId(4294967295).is_metachain());
    }

    #[test]
    fn test_block_record_defaults() {
        let record: BlockRecord = serde_json::from_str(r#"{"round": 9}"#).unwrap();
        assert_eq!(record.shard, ShardId(0));
        assert_eq!(record.round, 9);
        assert_eq!(record.tx_count, 0);
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("24h".parse::<Timeframe>().unwrap(), Timeframe::Day);
        assert_eq!("7D".parse::<Timeframe>().unwrap(), Timeframe::Week);
        assert!("1y".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_query_params() {
        assert_eq!(Timeframe::Day.interval(), "1h");
        assert_eq!(Timeframe::Quarter.interval(), "1d");
        assert_eq!(Timeframe::Month.days(), 30);
        assert_eq!(Timeframe::default(), Timeframe::Week);
    }
}
