//! Prometheus exposition endpoint.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;
use pulse_cache::FetchCache;

/// State of the `/metrics` router.
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus: PrometheusHandle,
    pub cache: FetchCache,
}

/// Renders every registered metric. The entry gauge is refreshed first since
/// it is otherwise only updated on lookups.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    state
        .cache
        .metrics()
        .update_entry_count(state.cache.entry_count());
    state.prometheus.render()
}
