//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::http::register_http_metrics;

/// Buckets de latencia (segundos), de 1ms a 30s. Los fetch remotos
/// tardan bastante mas que un hit de cache.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Instala el recorder global y registra todas las metricas.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)?
        .install_recorder()?;

    describe_all();

    info!("Metrics system initialized");
    Ok(handle)
}

/// Handle sin recorder global, para tests.
pub fn test_handle() -> Result<PrometheusHandle, BuildError> {
    Ok(PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)?
        .build_recorder()
        .handle())
}

fn describe_all() {
    pulse_cache::metrics::register_cache_metrics();
    pulse_sampler::register_sampler_metrics();
    register_http_metrics();
}
