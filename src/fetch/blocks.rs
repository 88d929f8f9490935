use std::collections::HashSet;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use serde_json::Value;

use crate::fallback::{first_of, Attempt};
use crate::fetch::normalize::{block_from_rest, block_from_rpc};
use crate::fetch::sampler::descending;
use crate::fetch::FetchContext;
use crate::models::BlockSummary;
use crate::probe::find_array;

pub fn block_paths(limit: usize) -> Vec<String> {
    vec![
        format!("/api/v2/blocks?page=1&page_size={}", limit),
        format!("/api/v1/blocks?limit={}&sort=desc", limit),
        format!("/api/blocks?limit={}", limit),
    ]
}

pub fn parse_block_listing(json: &Value, limit: usize) -> Option<Vec<BlockSummary>> {
    let items = find_array(json, &["items", "data", "result"], 2)?;
    let blocks: Vec<BlockSummary> = items.iter().take(limit).filter_map(block_from_rest).collect();
    (!blocks.is_empty()).then_some(blocks)
}

/// Newest first, one entry per block hash, at most `limit` entries.
pub fn finalize_blocks(mut blocks: Vec<BlockSummary>, limit: usize) -> Vec<BlockSummary> {
    blocks.sort_by(|a, b| b.number.cmp(&a.number));
    let mut seen = HashSet::new();
    blocks.retain(|b| {
        let key = if b.hash.is_empty() {
            format!("#{}", b.number)
        } else {
            b.hash.to_ascii_lowercase()
        };
        seen.insert(key)
    });
    blocks.truncate(limit);
    blocks
}

async fn blocks_from_rest(ctx: &FetchContext, limit: usize) -> Option<Vec<BlockSummary>> {
    ctx.explorer
        .probe(&block_paths(limit), ctx.tuning.listing_rest_timeout, |json| {
            parse_block_listing(json, limit)
        })
        .await
}

async fn blocks_from_rpc(ctx: &FetchContext, limit: usize) -> Option<Vec<BlockSummary>> {
    ctx.stats.inc_rpc_fallbacks();
    let latest = ctx.latest_block_number().await?;
    let blocks: Vec<BlockSummary> = stream::iter(descending(latest, limit as u64))
        .map(|n| ctx.block_header(n))
        .buffered(ctx.tuning.scan_concurrency.max(1))
        .filter_map(|b| async move { b.as_ref().map(block_from_rpc) })
        .collect()
        .await;
    (!blocks.is_empty()).then_some(blocks)
}

pub async fn fetch_recent_blocks(ctx: &FetchContext) -> Vec<BlockSummary> {
    let limit = ctx.tuning.recent_blocks_limit;
    let stages: Vec<(&'static str, Attempt<'_, Vec<BlockSummary>>)> = vec![
        ("explorer", blocks_from_rest(ctx, limit).boxed()),
        ("rpc", blocks_from_rpc(ctx, limit).boxed()),
    ];
    let blocks = first_of("recent-blocks", stages).await.unwrap_or_default();
    finalize_blocks(blocks, limit)
}
