use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::state::AppState;
use crate::chat::{ChatReply, ChatRequest};
use crate::dapps::catalog;
use crate::fetch::details::fetch_transaction_detail;
use crate::fetch::wallet::{fetch_wallet_balances, fetch_wallet_transactions};
use crate::fetch::{validate_address, validate_tx_hash};
use crate::models::{
    BlockSummary, ChainInfo, DAppCategory, DAppListing, DailyTransactions, NetworkStats, NetworkUtilization,
    TokenBalance, TransactionDetail, TransactionSummary,
};
use crate::poll::{QueryError, QueryKey, QueryState, TRANSACTION_DETAILS, WALLET_BALANCE, WALLET_TRANSACTIONS};
use crate::source_stats::SourceSnapshot;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn network_info(State(state): State<AppState>) -> Json<ChainInfo> {
    Json(state.ctx.chain_info())
}

pub async fn network_stats(State(state): State<AppState>) -> Json<QueryState<NetworkStats>> {
    Json(state.pollers.stats.state())
}

pub async fn recent_blocks(State(state): State<AppState>) -> Json<QueryState<Vec<BlockSummary>>> {
    Json(state.pollers.blocks.state())
}

pub async fn recent_transactions(
    State(state): State<AppState>,
) -> Json<QueryState<Vec<TransactionSummary>>> {
    Json(state.pollers.transactions.state())
}

pub async fn transaction_history(
    State(state): State<AppState>,
) -> Json<QueryState<Vec<DailyTransactions>>> {
    Json(state.pollers.history.state())
}

pub async fn network_utilization(
    State(state): State<AppState>,
) -> Json<QueryState<NetworkUtilization>> {
    Json(state.pollers.utilization.state())
}

pub async fn refetch(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if state.pollers.refetch(&key) {
        Ok((StatusCode::ACCEPTED, Json(json!({ "refetching": key }))))
    } else {
        Err(ApiError::NotFound(format!("no poller named {:?}", key)))
    }
}

/// Malformed and unknown hashes both answer 404.
pub async fn transaction_detail(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
) -> Result<Json<TransactionDetail>, ApiError> {
    let hash = validate_tx_hash(&raw_hash)?;
    let key = QueryKey::with_param(TRANSACTION_DETAILS.key, hash.to_ascii_lowercase());
    let ctx = state.ctx.clone();
    let detail = state
        .details
        .fetch(key, TRANSACTION_DETAILS.stale, TRANSACTION_DETAILS.retry, move || {
            let ctx = ctx.clone();
            let hash = hash.clone();
            async move {
                fetch_transaction_detail(&ctx, &hash)
                    .await
                    .map_err(QueryError::from)
            }
        })
        .await?;
    detail
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("transaction {} not found", raw_hash.trim())))
}

pub async fn wallet_balances(
    State(state): State<AppState>,
    Path(raw_address): Path<String>,
) -> Result<Json<Vec<TokenBalance>>, ApiError> {
    let address = validate_address(&raw_address)?;
    let key = QueryKey::with_param(WALLET_BALANCE.key, address.to_ascii_lowercase());
    let ctx = state.ctx.clone();
    let balances = state
        .balances
        .fetch(key, WALLET_BALANCE.stale, WALLET_BALANCE.retry, move || {
            let ctx = ctx.clone();
            let address = address.clone();
            async move {
                fetch_wallet_balances(&ctx, &address)
                    .await
                    .map_err(QueryError::from)
            }
        })
        .await?;
    Ok(Json(balances))
}

pub async fn wallet_transactions(
    State(state): State<AppState>,
    Path(raw_address): Path<String>,
) -> Result<Json<Vec<TransactionSummary>>, ApiError> {
    let address = validate_address(&raw_address)?;
    let key = QueryKey::with_param(WALLET_TRANSACTIONS.key, address.to_ascii_lowercase());
    let ctx = state.ctx.clone();
    let txs = state
        .wallet_txs
        .fetch(key, WALLET_TRANSACTIONS.stale, WALLET_TRANSACTIONS.retry, move || {
            let ctx = ctx.clone();
            let address = address.clone();
            async move {
                fetch_wallet_transactions(&ctx, &address)
                    .await
                    .map_err(QueryError::from)
            }
        })
        .await?;
    Ok(Json(txs))
}

#[derive(Debug, Deserialize)]
pub struct DAppsQuery {
    category: Option<String>,
}

pub async fn dapps(Query(query): Query<DAppsQuery>) -> Result<Json<Vec<DAppListing>>, ApiError> {
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(all) if all.eq_ignore_ascii_case("all") => None,
        Some(name) => Some(
            name.parse::<DAppCategory>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        ),
    };
    Ok(Json(catalog(category)))
}

pub async fn source_stats(State(state): State<AppState>) -> Json<SourceSnapshot> {
    Json(state.ctx.stats.snapshot())
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::WithDetails {
        status: StatusCode::BAD_REQUEST,
        message: "invalid chat request".to_string(),
        details: Value::String(rejection.body_text()),
    })?;
    let reply = state.chat.reply(&request.messages).await?;
    Ok(Json(reply))
}
