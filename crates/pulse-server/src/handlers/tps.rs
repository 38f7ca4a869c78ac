//! Live transactions-per-second endpoint.

use axum::{Json, extract::State};
use pulse_sampler::RateSnapshot;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TpsResponse {
    pub tps: f64,
    pub running: bool,
    #[serde(flatten)]
    pub snapshot: RateSnapshot,
}

/// Returns the last published rate. Never waits for the sampler.
pub async fn get_tps(State(state): State<AppState>) -> Json<TpsResponse> {
    let sampler = state.sampler();
    let snapshot = sampler.snapshot();

    Json(TpsResponse {
        tps: snapshot.rate,
        running: sampler.is_running(),
        snapshot,
    })
}
