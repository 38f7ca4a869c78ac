//! Server settings.
//!
//! Capas, de menor a mayor prioridad:
//! 1. Defaults de cada struct
//! 2. Archivo TOML opcional (`pulse.toml`, o la ruta en `PULSE_CONFIG`)
//! 3. Variables de entorno `PULSE__SECCION__CAMPO`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use pulse_cache::CacheConfig;
use pulse_sampler::SamplerConfig;
use pulse_sources::{CoinMarketCapConfig, MultiversxConfig};
use serde::Deserialize;

/// Environment variable holding the settings file path.
pub const CONFIG_PATH_ENV: &str = "PULSE_CONFIG";

/// Settings file used when `PULSE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "pulse.toml";

/// All server settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub cache: CacheConfig,
    pub ttl: TtlSettings,
    pub durable: DurableSettings,
    pub sampler: SamplerConfig,
    pub multiversx: MultiversxConfig,
    pub coinmarketcap: CoinMarketCapConfig,
    pub warmer: WarmerSettings,
    pub wallets: WalletList,
}

impl Settings {
    /// Loads settings from the default file location and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(path)
    }

    /// Loads settings from `path` (if it exists) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(path.as_ref(), Environment::with_prefix("PULSE"))
    }

    fn build(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("sampler.interval_seconds", self.sampler.interval_seconds),
            (
                "sampler.request_timeout_seconds",
                self.sampler.request_timeout_seconds,
            ),
            ("warmer.interval_seconds", self.warmer.interval_seconds),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ConfigError::Message(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        for wallet in self.wallets.iter() {
            if wallet.name.trim().is_empty() || wallet.address.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "wallet entries need a name and an address (got '{}')",
                    wallet.name
                )));
            }
        }

        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    /// Returns the address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Freshness window per dataset, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlSettings {
    pub network_stats: u64,
    pub staking_stats: u64,
    pub market_data: u64,
    pub price_data: u64,
    pub volume_data: u64,
    pub recent_transactions: u64,
    pub wallets: u64,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            network_stats: 300,
            staking_stats: 300,
            market_data: 60,
            price_data: 300,
            volume_data: 300,
            recent_transactions: 300,
            wallets: 300,
        }
    }
}

/// Durable side-store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DurableSettings {
    /// Whether wallet snapshots are persisted at all.
    pub enabled: bool,
    /// SQLite file. Unset or empty keeps records in process memory.
    pub path: Option<PathBuf>,
    /// Oldest record still served without fetching.
    pub max_age_seconds: u64,
}

impl DurableSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    /// The SQLite file to open, if any.
    pub fn sqlite_path(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl Default for DurableSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: Some(PathBuf::from("pulse.db")),
            max_age_seconds: 600,
        }
    }
}

/// Wallet warmer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarmerSettings {
    pub enabled: bool,
    /// Seconds between two warm-up rounds.
    pub interval_seconds: u64,
    /// Pause between two wallets of one round, in milliseconds.
    pub spacing_millis: u64,
}

impl WarmerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_millis)
    }
}

impl Default for WarmerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 600,
            spacing_millis: 1000,
        }
    }
}

/// A tracked exchange wallet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletConfig {
    /// Short name, used in the cache key (`{name}_wallet`) and the URL.
    pub name: String,
    /// On-chain address.
    pub address: String,
}

impl WalletConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Tracked wallets, in display order.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct WalletList(Vec<WalletConfig>);

impl WalletList {
    pub fn new(wallets: Vec<WalletConfig>) -> Self {
        Self(wallets)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WalletConfig> {
        self.0.iter()
    }

    /// Finds a wallet by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&WalletConfig> {
        self.0.iter().find(|w| w.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for WalletList {
    fn default() -> Self {
        let wallets = [
            ("binance", "erd1sdslvlxvfnnflzj42l8czrcngq3xjjzkjp3rgul4ttk6hntr4qdsv6sets"),
            ("binance_cold", "erd1v4ms58e22zjcp08suzqgm9ajmumwxcy4hfkdc23gvynnegjdflmsj6gmaq"),
            ("bybit", "erd1vj3efd5czwearu0gr3vjct8ef53lvtl7vs42vts2kh2qn3cucrnsj7ymqx"),
            ("upbit", "erd1hqamcl7hacu28q0l2kh7jt0vs6tjfhq4vp2tv7hufkx3phu0jn5ql3qw7x"),
            ("gateio", "erd1p4vy5n9mlkdys7xczegj398xtyvw2nawz00nnfh4yr7fpjh297cqtsu7lw"),
            ("bitfinex", "erd1a56dkgcpwwx6grmcvw9w5vpf9zeq53w3w7n6dmxcpxjry3l7uh2s3h9dtr"),
            ("cryptocom", "erd1hzccjg25yqaqnr732x2ka7pj5glx72pfqzf05jj9hxqn3lxkramq5zu8h4"),
            ("kraken", "erd1nmtkpqzhkla5yreu2dlyzm9fm8v902wjhvzu7xjjkd8ppefmtlws7qvx2a"),
            ("kucoin", "erd1ty4pvmjtl3mnsjvnsxgcpedd08fsn83f05tu0v5j23wnfce9p86snlkdyy"),
            ("kucoin_cold", "erd1vtlpm6sxxvmgt43ldsrpswjrfcsudmradylpxn9jkp66ra3rkz4qruzvfw"),
            ("bitget", "erd1w547kw69kpd60vlpr9pe0pn9nnqeljrcaz73znenjpgt0h3qlqqqm3szxj"),
            ("mexc", "erd1ezp86jwmcp4fmmu2mfqz0438py392z5wp6kzuqsjldgd68nwt89qshfs0y"),
            ("coinbase", "erd16jruked88jgtsar78ej85hjp3qsd9jkjcw4swsn7k0teqh3wgcqqgyrupq"),
            ("coinbase_cold", "erd16xta8867juxzm0sqmfevpa5karkd3l5k9cspns6zj28auv7nugqqpph374"),
        ];

        Self(
            wallets
                .into_iter()
                .map(|(name, address)| WalletConfig::new(name, address))
                .collect(),
        )
    }
}
