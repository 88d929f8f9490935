//! Network statistics reconciled from the explorer's stats endpoints and
//! sampling of recent blocks.
//!
//! The fetch never fails. The RPC head is the anchor for everything sampled;
//! when it is unreachable the default snapshot is returned. Every other
//! field degrades on its own to a documented estimate.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::eth::RpcBlock;
use crate::fetch::sampler::{descending, unique_addresses, BlockSampler};
use crate::fetch::FetchContext;
use crate::models::NetworkStats;
use crate::probe::{self, as_timestamp, find_array, probe_f64, probe_string, probe_u64, Rules};
use crate::units::round2;

pub const STATS_PATHS: &[&str] = &[
    "/api/v2/stats",
    "/api/v2/stats/summary",
    "/api/v1/stats",
    "/api/stats",
    "/api/v1/network/stats",
    "/api/network/stats",
    "/api?module=stats&action=ethsupply",
    "/api?module=proxy&action=eth_blockNumber",
    "/api?module=stats&action=tokensupply",
    "/api?module=stats&action=txcount",
];

pub const DAILY_PATHS: &[&str] = &[
    "/api/v1/stats/daily",
    "/api/stats/daily",
    "/api?module=stats&action=dailytx",
    "/api?module=stats&action=txcount24h",
    "/api/v1/charts/transactions?period=24h",
    "/api/charts/transactions?period=24h",
];

pub const CHART_PATHS: &[&str] = &["/api/v1/charts/transactions"];

pub const DAPPS_PATHS: &[&str] = &[
    "/api/v1/dapps",
    "/api/dapps",
    "/api?module=dapps&action=list",
];

const TOTAL_TRANSACTIONS: Rules = &[
    &["transactions_count"],
    &["transactionsCount"],
    &["total_transactions"],
    &["totalTransactions"],
    &["totalTx"],
    &["total_tx"],
    &["stats", "totalTransactions"],
];

const TOTAL_ADDRESSES: Rules = &[
    &["addresses_count"],
    &["addressesCount"],
    &["totalAddresses"],
    &["total_addresses"],
    &["totalUniqueAddresses"],
    &["total_unique_addresses"],
    &["stats", "totalAddresses"],
];

const ACTIVE_WALLETS: Rules = &[
    &["activeWallets"],
    &["active_wallets"],
    &["activeAddresses"],
    &["active_addresses"],
    &["uniqueAddresses"],
    &["unique_addresses"],
    &["stats", "activeWallets"],
];

const NETWORK_TPS: Rules = &[
    &["tps"],
    &["networkTPS"],
    &["network_tps"],
    &["transactionsPerSecond"],
    &["stats", "networkTPS"],
];

const DAILY_TRANSACTIONS: Rules = &[
    &["dailyTransactions"],
    &["daily_transactions"],
    &["txCount24h"],
    &["tx24h"],
    &["tx_24h"],
    &["transactions24h"],
    &["transactions_today"],
    &["stats", "dailyTransactions"],
];

const DAPPS: Rules = &[
    &["dappsCount"],
    &["dapps_count"],
    &["dapps"],
    &["totalDapps"],
    &["total_dapps"],
    &["stats", "dappsCount"],
    &["contracts_count"],
    &["contractsCount"],
];

const DAILY_ENDPOINT_COUNT: Rules = &[
    &["dailyTransactions"],
    &["daily_transactions"],
    &["tx24h"],
    &["tx_24h"],
    &["count"],
    &["total"],
];

pub(crate) const CHART_DAY: Rules = &[&["date"], &["day"]];
pub(crate) const CHART_COUNT: Rules = &[&["transactions"], &["transaction_count"], &["count"], &["value"]];
const LISTING_COUNT: Rules = &[&["count"], &["total"]];
const ETHERSCAN_STATUS: Rules = &[&["status"]];

/// Fields an explorer stats body may provide. Zero means absent.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RestStats {
    pub total_transactions: u64,
    pub total_addresses: u64,
    pub active_wallets: u64,
    pub network_tps: f64,
    pub daily_transactions: u64,
    pub dapps_count: u64,
}

impl RestStats {
    fn any(&self) -> bool {
        self.total_transactions > 0
            || self.total_addresses > 0
            || self.active_wallets > 0
            || self.network_tps > 0.0
            || self.daily_transactions > 0
            || self.dapps_count > 0
    }
}

fn positive(json: &Value, rules: Rules) -> u64 {
    rules
        .iter()
        .filter_map(|path| probe::lookup(json, path))
        .filter_map(probe::as_u64)
        .find(|v| *v > 0)
        .unwrap_or(0)
}

/// Etherscan-style `{status: "1", result: "<number>"}`.
fn etherscan_result(json: &Value) -> Option<u64> {
    if probe_string(json, ETHERSCAN_STATUS).as_deref() != Some("1") {
        return None;
    }
    json.get("result").and_then(probe::as_u64)
}

/// Applies the stats rule tables to one body; `None` unless some field is
/// non-zero.
pub fn parse_rest_stats(json: &Value) -> Option<RestStats> {
    let mut stats = RestStats {
        total_transactions: positive(json, TOTAL_TRANSACTIONS),
        total_addresses: positive(json, TOTAL_ADDRESSES),
        active_wallets: positive(json, ACTIVE_WALLETS),
        network_tps: probe_f64(json, NETWORK_TPS)
            .filter(|t| *t > 0.0)
            .unwrap_or(0.0),
        daily_transactions: positive(json, DAILY_TRANSACTIONS),
        dapps_count: positive(json, DAPPS),
    };
    if stats.total_transactions == 0 {
        stats.total_transactions = etherscan_result(json).unwrap_or(0);
    }
    stats.any().then_some(stats)
}

pub(crate) fn utc_day(ts: i64) -> Option<String> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

pub(crate) fn chart_entry_day(entry: &Value) -> Option<String> {
    probe_string(entry, CHART_DAY)
        .map(|d| d.chars().take(10).collect())
        .or_else(|| entry.get("timestamp").and_then(as_timestamp).and_then(utc_day))
}

/// Transaction count of `today`'s entry in a chart series.
pub fn today_from_chart(entries: &[Value], today: &str) -> Option<u64> {
    entries
        .iter()
        .find(|e| chart_entry_day(e).as_deref() == Some(today))
        .and_then(|e| probe_u64(e, CHART_COUNT))
        .filter(|c| *c > 0)
}

pub(crate) fn chart_entries(json: &Value) -> Option<&Vec<Value>> {
    find_array(json, &["data", "result", "chart_data"], 0)
}

fn parse_daily_endpoint(json: &Value, today: &str) -> Option<u64> {
    let direct = positive(json, DAILY_ENDPOINT_COUNT);
    if direct > 0 {
        return Some(direct);
    }
    json.as_array().and_then(|entries| today_from_chart(entries, today))
}

pub fn parse_dapps_count(json: &Value) -> Option<u64> {
    if let Some(entries) = find_array(json, &["result", "data"], 0) {
        return Some(entries.len() as u64);
    }
    Some(positive(json, LISTING_COUNT)).filter(|c| *c > 0)
}

/// Throughput over sampled blocks: transactions over the timestamp span
/// between the newest and oldest block, or the per-block average over the
/// assumed block time when the span is unusable.
pub fn throughput(blocks: &[Arc<RpcBlock>], assumed_block_time_secs: f64) -> Option<f64> {
    if blocks.is_empty() {
        return None;
    }
    let total: usize = blocks.iter().map(|b| b.transaction_count).sum();
    let newest = blocks.iter().map(|b| b.timestamp).max().unwrap_or(0);
    let oldest = blocks.iter().map(|b| b.timestamp).min().unwrap_or(0);
    let span = newest - oldest;
    let tps = if blocks.len() >= 2 && span > 0 {
        total as f64 / span as f64
    } else {
        (total as f64 / blocks.len() as f64) / assumed_block_time_secs
    };
    Some(round2(tps))
}

fn average_tx_per_block(blocks: &[Arc<RpcBlock>]) -> Option<f64> {
    if blocks.is_empty() {
        return None;
    }
    let total: usize = blocks.iter().map(|b| b.transaction_count).sum();
    Some(total as f64 / blocks.len() as f64)
}

/// Snaps an extrapolated daily count to `reference` when it falls within
/// `tolerance` of it.
pub fn snap_to_reference(estimate: u64, reference: Option<u64>, tolerance: f64) -> u64 {
    match reference {
        Some(r) => {
            let low = (r as f64 * (1.0 - tolerance)).round() as u64;
            let high = (r as f64 * (1.0 + tolerance)).round() as u64;
            if (low..=high).contains(&estimate) {
                r
            } else {
                estimate
            }
        }
        None => estimate,
    }
}

fn default_snapshot(ctx: &FetchContext) -> NetworkStats {
    NetworkStats {
        dapps_count: ctx.tuning.dapps_fallback_count,
        ..NetworkStats::default()
    }
}

pub async fn fetch_network_stats(ctx: &FetchContext) -> NetworkStats {
    let latest = match ctx.latest_block_number().await {
        Some(n) => n,
        None => return default_snapshot(ctx),
    };
    let tuning = &ctx.tuning;
    let sampler = BlockSampler::new(ctx);

    let rest = ctx
        .explorer
        .probe(STATS_PATHS, tuning.stats_rest_timeout, parse_rest_stats)
        .await
        .unwrap_or_default();

    let tps_blocks = sampler.recent(latest, tuning.tps_sample_blocks).await;
    let network_tps = throughput(&tps_blocks, tuning.assumed_block_time_secs).unwrap_or(rest.network_tps);

    let total_transactions = if rest.total_transactions > 0 {
        rest.total_transactions
    } else {
        let avg = average_tx_per_block(&tps_blocks).unwrap_or(tuning.fallback_avg_tx_per_block);
        latest.saturating_mul(avg.round() as u64)
    };

    let daily_transactions = if rest.daily_transactions > 0 {
        rest.daily_transactions
    } else {
        daily_transactions(ctx, &sampler, latest, network_tps).await
    };

    let total_addresses = if rest.total_addresses > 0 {
        rest.total_addresses
    } else {
        estimate_total_addresses(ctx, &sampler, latest, total_transactions).await
    };

    let active_wallets = if rest.active_wallets > 0 {
        rest.active_wallets
    } else {
        estimate_active_wallets(ctx, &sampler, latest, total_addresses, total_transactions).await
    };

    let dapps_count = if rest.dapps_count > 0 {
        rest.dapps_count
    } else {
        ctx.explorer
            .probe(DAPPS_PATHS, tuning.stats_rest_timeout, parse_dapps_count)
            .await
            .unwrap_or(tuning.dapps_fallback_count)
    };

    tracing::debug!("stats fetch sampled {} blocks", sampler.memoized());

    NetworkStats {
        current_block: latest,
        total_transactions,
        active_wallets,
        network_tps,
        total_blocks: latest,
        daily_transactions,
        total_addresses,
        dapps_count,
    }
}

async fn daily_transactions(ctx: &FetchContext, sampler: &BlockSampler<'_>, latest: u64, tps: f64) -> u64 {
    let tuning = &ctx.tuning;
    let today = Utc::now().format("%Y-%m-%d").to_string();

    let from_rest = ctx
        .explorer
        .probe(DAILY_PATHS, tuning.stats_rest_timeout, |json| parse_daily_endpoint(json, &today))
        .await;
    if let Some(count) = from_rest {
        return count;
    }

    let from_chart = ctx
        .explorer
        .probe(CHART_PATHS, tuning.stats_rest_timeout, |json| {
            chart_entries(json).and_then(|entries| today_from_chart(entries, &today))
        })
        .await;
    if let Some(count) = from_chart {
        return count;
    }

    let scan = tuning.daily_scan_blocks.min(tuning.blocks_per_day);
    let blocks = sampler.recent(latest, scan).await;
    match average_tx_per_block(&blocks) {
        Some(avg) => {
            let estimate = (avg * tuning.blocks_per_day as f64).round() as u64;
            snap_to_reference(estimate, tuning.daily_tx_reference, tuning.daily_tx_tolerance)
        }
        None if tps > 0.0 => (tps * 86_400.0).round() as u64,
        None => tuning.daily_tx_reference.unwrap_or(0),
    }
}

/// Blocks `latest, latest - 1, ...` inside `window` (genesis excluded), keeping
/// the first `limit` that could be fetched.
async fn sample_window(sampler: &BlockSampler<'_>, latest: u64, window: u64, limit: u64) -> Vec<Arc<RpcBlock>> {
    let mut blocks = sampler.sample(descending(latest, window.min(latest))).await;
    blocks.truncate(limit as usize);
    blocks
}

async fn estimate_total_addresses(
    ctx: &FetchContext,
    sampler: &BlockSampler<'_>,
    latest: u64,
    total_transactions: u64,
) -> u64 {
    let tuning = &ctx.tuning;
    let blocks = sample_window(sampler, latest, tuning.address_scan_window, tuning.address_sample_blocks).await;
    let unique = unique_addresses(&blocks).len();
    if unique == 0 || latest == 0 {
        return total_transactions / 10;
    }
    let ratio = (blocks.len() as f64 / latest as f64).max(0.01);
    (unique as f64 / ratio).floor() as u64
}

async fn estimate_active_wallets(
    ctx: &FetchContext,
    sampler: &BlockSampler<'_>,
    latest: u64,
    total_addresses: u64,
    total_transactions: u64,
) -> u64 {
    let tuning = &ctx.tuning;
    let blocks = sample_window(sampler, latest, tuning.active_scan_window, tuning.active_sample_blocks).await;
    let unique = unique_addresses(&blocks).len();
    if unique == 0 {
        return if total_addresses > 0 {
            (total_addresses as f64 * 0.1).floor() as u64
        } else {
            total_transactions / 15
        };
    }
    let ratio = (blocks.len() as f64 / tuning.blocks_per_day as f64).max(0.1);
    (unique as f64 / ratio).floor() as u64
}
