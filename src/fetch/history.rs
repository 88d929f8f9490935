use chrono::NaiveDate;
use serde_json::Value;

use crate::fetch::normalize::now_secs;
use crate::fetch::sampler::{descending, BlockSampler};
use crate::fetch::stats::{chart_entries, chart_entry_day, utc_day, CHART_COUNT};
use crate::fetch::FetchContext;
use crate::models::DailyTransactions;
use crate::probe::{as_timestamp, probe_u64};

pub const HISTORY_PATHS: &[&str] = &[
    "/api/v1/charts/transactions",
    "/api/charts/transactions",
    "/api?module=chart&action=transactionhistory",
];

const SECS_PER_DAY: i64 = 86_400;

fn day_start(day: &str) -> Option<i64> {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn chart_point(entry: &Value) -> Option<DailyTransactions> {
    let date = chart_entry_day(entry)?;
    let timestamp = entry
        .get("timestamp")
        .and_then(as_timestamp)
        .or_else(|| day_start(&date))?;
    Some(DailyTransactions {
        date,
        transactions: probe_u64(entry, CHART_COUNT).unwrap_or(0),
        timestamp,
    })
}

/// The last `days` points of a chart series, oldest first.
pub fn parse_history(json: &Value, days: usize) -> Option<Vec<DailyTransactions>> {
    let entries = chart_entries(json)?;
    let mut points: Vec<DailyTransactions> = entries.iter().filter_map(chart_point).collect();
    points.sort_by_key(|p| p.timestamp);
    let skip = points.len().saturating_sub(days);
    let points: Vec<DailyTransactions> = points.into_iter().skip(skip).collect();
    (!points.is_empty()).then_some(points)
}

fn default_point(ctx: &FetchContext, timestamp: i64) -> DailyTransactions {
    DailyTransactions {
        date: utc_day(timestamp).unwrap_or_default(),
        transactions: ctx.tuning.history_default_daily_tx,
        timestamp,
    }
}

/// Per-day estimates from a handful of blocks sampled one day-length of
/// blocks apart, walking back from the head.
async fn estimate_from_blocks(ctx: &FetchContext) -> Vec<DailyTransactions> {
    let tuning = &ctx.tuning;
    let now = now_secs();
    let latest = ctx.latest_block_number().await;
    let sampler = BlockSampler::new(ctx);

    let mut points = Vec::with_capacity(tuning.history_days);
    for day in 0..tuning.history_days as u64 {
        let timestamp = now - day as i64 * SECS_PER_DAY;
        let target = latest.and_then(|l| l.checked_sub(day * tuning.blocks_per_day));
        let point = match target {
            Some(target) => {
                let blocks = sampler
                    .sample(descending(target, tuning.history_blocks_per_day_sample))
                    .await;
                if blocks.is_empty() {
                    default_point(ctx, timestamp)
                } else {
                    let total: usize = blocks.iter().map(|b| b.transaction_count).sum();
                    let avg = total as f64 / blocks.len() as f64;
                    DailyTransactions {
                        date: utc_day(timestamp).unwrap_or_default(),
                        transactions: (avg * tuning.blocks_per_day as f64).round() as u64,
                        timestamp,
                    }
                }
            }
            None => default_point(ctx, timestamp),
        };
        points.push(point);
    }
    points.sort_by_key(|p| p.timestamp);
    points
}

/// Daily transaction counts for the configured number of days, oldest first.
pub async fn fetch_transaction_history(ctx: &FetchContext) -> Vec<DailyTransactions> {
    let days = ctx.tuning.history_days;
    let from_chart = ctx
        .explorer
        .probe(HISTORY_PATHS, ctx.tuning.stats_rest_timeout, |json| parse_history(json, days))
        .await;
    if let Some(points) = from_chart {
        tracing::info!("transaction-history resolved via explorer chart");
        return points;
    }
    ctx.stats.inc_rpc_fallbacks();
    tracing::info!("transaction-history: no chart available, estimating from blocks");
    estimate_from_blocks(ctx).await
}
