use std::net::SocketAddr;

use axum::{Router, http::Method, middleware, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{
    datasets::{
        get_history, get_market, get_network, get_staking, get_transactions, get_volumes,
        get_wallet,
    },
    health::health_check,
    metrics::{MetricsState, metrics_handler},
    tps::get_tps,
    wallets::get_wallets,
};
use crate::metrics::http::http_metrics_middleware;
use crate::middleware::{LoggingLayer, RequestIdLayer};
use crate::state::AppState;

/// Builds the full router.
pub fn create_router(state: AppState, prometheus: PrometheusHandle) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    // El dashboard se sirve desde otro origen
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(MetricsState {
            prometheus,
            cache: state.cache().clone(),
        });

    let api_router = Router::new()
        .route("/network", get(get_network))
        .route("/staking", get(get_staking))
        .route("/market", get(get_market))
        .route("/history/{timeframe}", get(get_history))
        .route("/volumes", get(get_volumes))
        .route("/transactions", get(get_transactions))
        .route("/wallets", get(get_wallets))
        .route("/wallets/{name}", get(get_wallet))
        .route("/tps", get(get_tps));

    let app_router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state);

    Router::new()
        .merge(app_router)
        .merge(metrics_router)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(cors)
        .layer(middleware_stack)
}

/// Serves `router` on `addr` until Ctrl+C or SIGTERM.
pub async fn serve(addr: SocketAddr, router: Router) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
