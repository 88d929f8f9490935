use std::collections::HashSet;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use serde_json::Value;

use crate::eth::RpcTransaction;
use crate::fallback::{first_of, Attempt};
use crate::fetch::normalize::{
    dedup_by_hash, summary_from_rest, summary_from_rpc, BLOCK_NUMBER, BLOCK_TIMESTAMP,
};
use crate::fetch::FetchContext;
use crate::models::{TransactionSummary, TxStatus};
use crate::probe::{find_array, find_array_by_marker, probe_timestamp, probe_u64};

pub const TRANSACTION_PATHS: &[&str] = &[
    "/api/v2/transactions",
    "/api/v2/transactions?page=1&page_size=50",
    "/api/v2/transactions?page=1&page_size=50&sort=desc",
    "/api/v2/transactions?filter=to%20OR%20from&page=1&page_size=50",
    "/api/v2/transactions?page=1&page_size=100",
    "/api/v2/transactions?page=1&page_size=20",
    "/api/v1/transactions?limit=50&sort=desc",
    "/api/v1/txs?limit=50&sort=desc",
    "/api/transactions?limit=50",
    "/api/v2/transactions?filter=to&page=1&page_size=50",
    "/api/v2/transactions?filter=from&page=1&page_size=50",
];

pub const BLOCK_LISTING_PATH: &str = "/api/v2/blocks?page=1&page_size=20";

const LISTING_KEYS: &[&str] = &["items", "data", "result", "transactions", "results"];
const HASH_MARKERS: &[&str] = &["hash", "tx_hash", "transactionHash"];
const LISTING_WINDOW: usize = 50;
const BLOCKS_TO_EXPAND: usize = 10;

/// Locates the transaction array of a listing response.
pub fn listing_items(json: &Value) -> Option<&Vec<Value>> {
    find_array(json, LISTING_KEYS, 2).or_else(|| find_array_by_marker(json, HASH_MARKERS))
}

pub fn parse_transaction_listing(ctx: &FetchContext, json: &Value) -> Option<Vec<TransactionSummary>> {
    let items = listing_items(json)?;
    let txs: Vec<TransactionSummary> = items
        .iter()
        .take(LISTING_WINDOW)
        .filter_map(|item| summary_from_rest(item, ctx.native_decimals(), ctx.rescale(), None))
        .collect();
    (!txs.is_empty()).then_some(txs)
}

/// Newest first, unique by hash, at most `limit` entries.
pub fn finalize_transactions(txs: Vec<TransactionSummary>, limit: usize) -> Vec<TransactionSummary> {
    let mut txs = dedup_by_hash(txs);
    txs.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(b.block_number.cmp(&a.block_number))
    });
    txs.truncate(limit);
    txs
}

async fn from_listing(ctx: &FetchContext) -> Option<Vec<TransactionSummary>> {
    ctx.explorer
        .probe(TRANSACTION_PATHS, ctx.tuning.detail_rest_timeout, |json| {
            parse_transaction_listing(ctx, json)
        })
        .await
}

/// Recent blocks from the explorer, then each block's transaction listing.
async fn from_block_listings(ctx: &FetchContext, limit: usize) -> Option<Vec<TransactionSummary>> {
    let blocks = ctx
        .explorer
        .probe(&[BLOCK_LISTING_PATH], ctx.tuning.detail_rest_timeout, |json| {
            let items = find_array(json, &["items", "data", "results"], 3)?;
            let refs: Vec<(u64, Option<i64>)> = items
                .iter()
                .filter_map(|b| {
                    let number = probe_u64(b, BLOCK_NUMBER)?;
                    Some((number, probe_timestamp(b, BLOCK_TIMESTAMP)))
                })
                .collect();
            (!refs.is_empty()).then_some(refs)
        })
        .await?;

    let mut collected = Vec::new();
    for (number, block_ts) in blocks.into_iter().take(BLOCKS_TO_EXPAND) {
        let path = format!("/api/v2/blocks/{}/transactions", number);
        let txs = ctx
            .explorer
            .probe(&[path], ctx.tuning.listing_rest_timeout, |json| {
                let items = find_array(json, &["items", "data", "results"], 3)?;
                let txs: Vec<TransactionSummary> = items
                    .iter()
                    .filter_map(|item| summary_from_rest(item, ctx.native_decimals(), ctx.rescale(), block_ts))
                    .map(|mut tx| {
                        if tx.block_number == 0 {
                            tx.block_number = number;
                        }
                        tx
                    })
                    .collect();
                Some(txs)
            })
            .await
            .unwrap_or_default();
        collected.extend(txs);
        if collected.len() >= limit {
            break;
        }
    }
    (!collected.is_empty()).then_some(collected)
}

async fn receipt_status(ctx: &FetchContext, hash: &str) -> TxStatus {
    ctx.stats.inc_rpc_calls(1);
    match tokio::time::timeout(ctx.tuning.receipt_timeout, ctx.rpc.receipt(hash)).await {
        Ok(Ok(Some(receipt))) => match receipt.success {
            Some(true) => TxStatus::Success,
            Some(false) => TxStatus::Failed,
            None => TxStatus::Pending,
        },
        Ok(Ok(None)) => TxStatus::Pending,
        Ok(Err(err)) => {
            ctx.stats.inc_rpc_errors();
            tracing::debug!("receipt {} unavailable: {}", hash, err);
            TxStatus::Pending
        }
        Err(_) => TxStatus::Pending,
    }
}

/// Scans backward from the head until `limit` transactions are found or the
/// scan ceiling is reached.
async fn from_rpc_scan(ctx: &FetchContext, limit: usize) -> Option<Vec<TransactionSummary>> {
    ctx.stats.inc_rpc_fallbacks();
    let latest = ctx.latest_block_number().await?;
    let ceiling = ctx.tuning.recent_tx_scan_ceiling.min(latest + 1);

    let mut seen = HashSet::new();
    let mut found: Vec<(RpcTransaction, TransactionSummary)> = Vec::new();
    let mut blocks = stream::iter(0..ceiling)
        .map(|i| ctx.block_with_txs(latest - i))
        .buffered(ctx.tuning.scan_concurrency.max(1));

    while let Some(block) = blocks.next().await {
        let block = match block {
            Some(b) => b,
            None => continue,
        };
        for tx in &block.transactions {
            if tx.from.is_empty() || !seen.insert(tx.hash.to_ascii_lowercase()) {
                continue;
            }
            let summary = summary_from_rpc(tx, &block, TxStatus::Pending, ctx.native_decimals(), ctx.rescale());
            found.push((tx.clone(), summary));
            if found.len() >= limit {
                break;
            }
        }
        if found.len() >= limit {
            break;
        }
    }
    drop(blocks);

    let resolved: Vec<TransactionSummary> = stream::iter(found)
        .map(|(tx, mut summary)| async move {
            summary.status = receipt_status(ctx, &tx.hash).await;
            summary
        })
        .buffered(ctx.tuning.scan_concurrency.max(1))
        .collect()
        .await;
    (!resolved.is_empty()).then_some(resolved)
}

pub async fn fetch_recent_transactions(ctx: &FetchContext) -> Vec<TransactionSummary> {
    let limit = ctx.tuning.recent_tx_limit;
    let stages: Vec<(&'static str, Attempt<'_, Vec<TransactionSummary>>)> = vec![
        ("explorer listing", from_listing(ctx).boxed()),
        ("explorer blocks", from_block_listings(ctx, limit).boxed()),
        ("rpc scan", from_rpc_scan(ctx, limit).boxed()),
    ];
    let txs = first_of("recent-transactions", stages).await.unwrap_or_default();
    finalize_transactions(txs, limit)
}
