//! Dataset endpoints under `/api`.

use axum::{
    Json,
    extract::{Path, State},
};
use pulse_cache::{CacheLookup, Origin};
use pulse_core::{CacheKey, Payload, Timeframe};
use serde::Serialize;
use tracing::instrument;

use crate::datasets::Dataset;
use crate::error::AppError;
use crate::state::AppState;

/// A cached dataset and where it came from.
#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub key: String,
    pub origin: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_reason: Option<String>,
    pub data: Payload,
}

impl DatasetResponse {
    pub fn new(key: &CacheKey, lookup: &CacheLookup) -> Self {
        let stale_reason = match lookup.origin() {
            Origin::Stale { reason } => Some(reason.clone()),
            _ => None,
        };

        Self {
            key: key.to_string(),
            origin: lookup.origin().label(),
            stale_reason,
            data: lookup.value().clone(),
        }
    }
}

async fn serve(state: &AppState, dataset: Dataset) -> Result<Json<DatasetResponse>, AppError> {
    let (key, lookup) = state.datasets().lookup(&dataset).await?;
    Ok(Json(DatasetResponse::new(&key, &lookup)))
}

#[instrument(skip_all)]
pub async fn get_network(State(state): State<AppState>) -> Result<Json<DatasetResponse>, AppError> {
    serve(&state, Dataset::NetworkStats).await
}

#[instrument(skip_all)]
pub async fn get_staking(State(state): State<AppState>) -> Result<Json<DatasetResponse>, AppError> {
    serve(&state, Dataset::StakingStats).await
}

#[instrument(skip_all)]
pub async fn get_market(State(state): State<AppState>) -> Result<Json<DatasetResponse>, AppError> {
    serve(&state, Dataset::MarketData).await
}

#[instrument(skip_all, fields(timeframe = %timeframe))]
pub async fn get_history(
    State(state): State<AppState>,
    Path(timeframe): Path<String>,
) -> Result<Json<DatasetResponse>, AppError> {
    let timeframe: Timeframe = timeframe.parse()?;
    serve(&state, Dataset::PriceHistory(timeframe)).await
}

#[instrument(skip_all)]
pub async fn get_volumes(State(state): State<AppState>) -> Result<Json<DatasetResponse>, AppError> {
    serve(&state, Dataset::ExchangeVolumes).await
}

#[instrument(skip_all)]
pub async fn get_transactions(
    State(state): State<AppState>,
) -> Result<Json<DatasetResponse>, AppError> {
    serve(&state, Dataset::RecentTransactions).await
}

#[instrument(skip_all, fields(wallet = %name))]
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DatasetResponse>, AppError> {
    let wallet = state
        .wallet(&name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown wallet '{}'", name)))?;

    serve(&state, Dataset::wallet(wallet)).await
}
