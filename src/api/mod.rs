mod error;
mod handlers;
mod state;

pub use error::ApiError;
pub use state::{AppState, Pollers};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/network", get(handlers::network_info))
        .route("/api/stats", get(handlers::network_stats))
        .route("/api/blocks", get(handlers::recent_blocks))
        .route("/api/transactions", get(handlers::recent_transactions))
        .route("/api/transactions/history", get(handlers::transaction_history))
        .route("/api/utilization", get(handlers::network_utilization))
        .route("/api/refetch/:key", post(handlers::refetch))
        .route("/api/tx/:hash", get(handlers::transaction_detail))
        .route("/api/wallet/:address/balances", get(handlers::wallet_balances))
        .route("/api/wallet/:address/transactions", get(handlers::wallet_transactions))
        .route("/api/dapps", get(handlers::dapps))
        .route("/api/chat", post(handlers::chat))
        .route("/stats/sources", get(handlers::source_stats))
        .with_state(state)
}

pub async fn run_http_server(state: AppState, addr: &str) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
