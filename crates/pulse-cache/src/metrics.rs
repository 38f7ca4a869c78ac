//! Cache metrics recording.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registra las metricas de cache.
/// Llamar una vez al inicio para registrar las metricas.
pub fn register_cache_metrics() {
    metrics::describe_counter!("pulse_cache_hits_total", "Total number of fresh cache hits");
    metrics::describe_counter!("pulse_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "pulse_cache_stale_served_total",
        "Stale values served after a failed fetch"
    );
    metrics::describe_counter!(
        "pulse_cache_fetch_failures_total",
        "Total number of failed fetcher invocations"
    );
    metrics::describe_counter!(
        "pulse_cache_durable_hits_total",
        "Values served from the durable store"
    );
    metrics::describe_counter!(
        "pulse_cache_durable_write_failures_total",
        "Failed writes to the durable store"
    );
    metrics::describe_counter!(
        "pulse_cache_evictions_total",
        "Total number of cache evictions"
    );
    metrics::describe_gauge!("pulse_cache_entries", "Current number of entries in cache");
    metrics::describe_histogram!(
        "pulse_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Recorder de metricas de cache.
/// Usa atomic counters internos para consultas rapidas.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    stale_served: Arc<AtomicU64>,
    fetch_failures: Arc<AtomicU64>,
    durable_hits: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            stale_served: Arc::new(AtomicU64::new(0)),
            fetch_failures: Arc::new(AtomicU64::new(0)),
            durable_hits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registra un cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("pulse_cache_hits_total").increment(1);
    }

    /// Registra un cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("pulse_cache_misses_total").increment(1);
    }

    /// Registra un valor viejo servido tras un fetch fallido
    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
        counter!("pulse_cache_stale_served_total").increment(1);
    }

    /// Registra un fetch fallido
    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        counter!("pulse_cache_fetch_failures_total").increment(1);
    }

    /// Registra un valor servido desde el store durable
    pub fn record_durable_hit(&self) {
        self.durable_hits.fetch_add(1, Ordering::Relaxed);
        counter!("pulse_cache_durable_hits_total").increment(1);
    }

    /// Registra una escritura durable fallida
    pub fn record_durable_write_failure(&self) {
        counter!("pulse_cache_durable_write_failures_total").increment(1);
    }

    /// Registra una eviction
    pub fn record_eviction(&self, reason: &str) {
        counter!("pulse_cache_evictions_total", "reason" => reason.to_string()).increment(1);
    }

    /// Actualiza el gauge de entries
    pub fn update_entry_count(&self, count: u64) {
        gauge!("pulse_cache_entries").set(count as f64);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, operation: &str, duration: Duration) {
        histogram!(
            "pulse_cache_operation_seconds",
            "operation" => operation.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Calcula hit rate (para logging/debugging)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Retorna el numero de hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Retorna el numero de misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Retorna cuantas veces se sirvio un valor viejo
    pub fn stale_served(&self) -> u64 {
        self.stale_served.load(Ordering::Relaxed)
    }

    /// Retorna el numero de fetches fallidos
    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    /// Retorna cuantos valores vinieron del store durable
    pub fn durable_hits(&self) -> u64 {
        self.durable_hits.load(Ordering::Relaxed)
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}
