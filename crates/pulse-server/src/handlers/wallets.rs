//! Summary of every tracked exchange wallet.

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use pulse_sources::WalletSnapshot;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{instrument, warn};

use crate::datasets::Dataset;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WalletsResponse {
    /// Sum of all loaded balances, in EGLD.
    pub total_balance: f64,
    pub inflow_24h: f64,
    pub outflow_24h: f64,
    pub net_flow_24h: f64,
    pub wallets: Vec<WalletSummary>,
    pub errors: Vec<WalletFailure>,
}

#[derive(Debug, Serialize)]
pub struct WalletSummary {
    pub name: String,
    pub address: String,
    pub balance: f64,
    /// Porcentaje del balance total (0-100).
    pub share_percent: f64,
    pub inflow_24h: f64,
    pub outflow_24h: f64,
    pub origin: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WalletFailure {
    pub name: String,
    pub message: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl WalletsResponse {
    fn build(mut wallets: Vec<WalletSummary>, errors: Vec<WalletFailure>) -> Self {
        let total_balance: f64 = wallets.iter().map(|w| w.balance).sum();
        let inflow_24h: f64 = wallets.iter().map(|w| w.inflow_24h).sum();
        let outflow_24h: f64 = wallets.iter().map(|w| w.outflow_24h).sum();

        for wallet in &mut wallets {
            wallet.share_percent = if total_balance > 0.0 {
                round2(wallet.balance / total_balance * 100.0)
            } else {
                0.0
            };
        }

        Self {
            total_balance,
            inflow_24h,
            outflow_24h,
            net_flow_24h: inflow_24h - outflow_24h,
            wallets,
            errors,
        }
    }
}

/// Loads every wallet concurrently; failures are listed, not fatal.
#[instrument(skip_all, fields(wallets = state.wallets().len()))]
pub async fn get_wallets(State(state): State<AppState>) -> Json<WalletsResponse> {
    let since = Utc::now() - Duration::hours(24);
    let mut tasks = JoinSet::new();

    for (index, wallet) in state.wallets().iter().enumerate() {
        let loader = state.datasets().clone();
        let dataset = Dataset::wallet(wallet);
        let name = wallet.name.clone();
        let address = wallet.address.clone();

        tasks.spawn(async move {
            let result = match loader.lookup(&dataset).await {
                Ok((_, lookup)) => serde_json::from_value::<WalletSnapshot>(lookup.value().clone())
                    .map(|snapshot| {
                        let (inflow_24h, outflow_24h) = snapshot.flows_since(since);
                        WalletSummary {
                            name: name.clone(),
                            address,
                            balance: snapshot.balance,
                            share_percent: 0.0,
                            inflow_24h,
                            outflow_24h,
                            origin: lookup.origin().label(),
                        }
                    })
                    .map_err(|err| format!("unreadable snapshot: {}", err)),
                Err(err) => Err(err.to_string()),
            };
            (index, name, result)
        });
    }

    let mut results = Vec::with_capacity(state.wallets().len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => warn!(error = %err, "Wallet task failed"),
        }
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut wallets = Vec::new();
    let mut errors = Vec::new();
    for (_, name, result) in results {
        match result {
            Ok(summary) => wallets.push(summary),
            Err(message) => {
                warn!(wallet = %name, error = %message, "Wallet unavailable");
                errors.push(WalletFailure { name, message });
            },
        }
    }

    Json(WalletsResponse::build(wallets, errors))
}
