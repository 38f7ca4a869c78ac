//! Configuracion del fetch cache.

use std::time::Duration;

use serde::Deserialize;

/// Configuracion del cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL por defecto en segundos (default: 300 = 5 minutos)
    pub default_ttl_seconds: u64,
    /// Maximo numero de entries (default: 10000)
    pub max_capacity: u64,
    /// Un solo fetch en vuelo por key (default: false)
    pub single_flight: bool,
}

impl CacheConfig {
    /// Retorna el TTL por defecto como `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 300,
            max_capacity: 10_000,
            single_flight: false,
        }
    }
}
