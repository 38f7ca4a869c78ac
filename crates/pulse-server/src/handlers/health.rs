use axum::{Json, extract::State};
use pulse_cache::StoreStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
    pub cache_entries: u64,
    pub sampler_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durable: Option<DurableHealth>,
}

#[derive(Debug, Serialize)]
pub struct DurableHealth {
    pub store: String,
    #[serde(flatten)]
    pub stats: Option<StoreStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let durable = match state.cache().durable_store() {
        Some(store) => Some(match store.stats().await {
            Ok(stats) => DurableHealth {
                store: store.name().to_string(),
                stats: Some(stats),
                error: None,
            },
            Err(err) => DurableHealth {
                store: store.name().to_string(),
                stats: None,
                error: Some(err.to_string()),
            },
        }),
        None => None,
    };

    // Un store caido degrada el servicio pero no lo tumba
    Json(HealthResponse {
        status: "UP".to_string(),
        version: crate::version(),
        cache_entries: state.cache().entry_count(),
        sampler_running: state.sampler().is_running(),
        durable,
    })
}
