use serde_json::Value;

use crate::eth::{erc20_balance_of, erc20_decimals, erc20_symbol};
use crate::fetch::normalize::{dedup_by_hash, summary_from_rest};
use crate::fetch::{validate_address, FetchContext, FetchError};
use crate::models::{TokenBalance, TransactionSummary};
use crate::probe::{as_string, as_u256, find_array, probe_string, probe_u64, Rules};
use crate::units::format_units;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
const DEFAULT_TOKEN_DECIMALS: u32 = 6;
const WALLET_TX_WINDOW: usize = 50;

const TOKEN_DECIMALS: Rules = &[&["decimals"], &["contract_decimals"]];
const TOKEN_SYMBOL: Rules = &[&["symbol"], &["name"]];
const TOKEN_ADDRESS: Rules = &[&["address"], &["address_hash"], &["contract_address"]];

pub fn balance_path(address: &str) -> String {
    format!("/api/v2/addresses/{}/token-balances", address)
}

pub fn wallet_tx_paths(address: &str) -> Vec<String> {
    vec![
        format!("/api/v2/addresses/{}/transactions?limit=50", address),
        format!(
            "/api?module=account&action=txlist&address={}&startblock=0&endblock=99999999&sort=desc",
            address
        ),
        format!("/api/v1/transactions?address={}&limit=50", address),
    ]
}

/// The two balances this service reports. Either may still be missing after
/// the explorer pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BalancePair {
    pub native: Option<TokenBalance>,
    pub secondary: Option<TokenBalance>,
}

/// Picks the native and secondary entries out of a token-balances listing.
/// Every other token is ignored.
pub fn parse_token_balances(ctx: &FetchContext, json: &Value) -> Option<BalancePair> {
    let entries = find_array(json, &["items"], 1)?;
    let native = &ctx.chain.native;
    let secondary = &ctx.chain.secondary_token;
    let mut pair = BalancePair::default();

    for entry in entries {
        let token = match entry.get("token") {
            Some(t) if t.is_object() => t,
            _ => continue,
        };
        let raw = match entry.get("value").and_then(as_u256) {
            Some(v) => v,
            None => continue,
        };
        let decimals = probe_u64(token, TOKEN_DECIMALS)
            .map(|d| d as u32)
            .unwrap_or(DEFAULT_TOKEN_DECIMALS);
        let symbol = probe_string(token, TOKEN_SYMBOL)
            .unwrap_or_default()
            .to_ascii_uppercase();
        let address = probe_string(token, TOKEN_ADDRESS)
            .unwrap_or_default()
            .to_ascii_lowercase();

        let is_native = symbol.eq_ignore_ascii_case(&native.symbol)
            || address.eq_ignore_ascii_case(&native.precompile_address)
            || address == ZERO_ADDRESS;
        let is_secondary = symbol.eq_ignore_ascii_case(&secondary.symbol)
            || address.eq_ignore_ascii_case(&secondary.address);

        let balance = TokenBalance {
            symbol: String::new(),
            balance: format_units(raw, decimals),
            decimals,
            contract_address: (!address.is_empty()).then_some(address),
        };
        if is_native && pair.native.is_none() {
            pair.native = Some(TokenBalance {
                symbol: native.symbol.clone(),
                ..balance
            });
        } else if is_secondary && pair.secondary.is_none() {
            pair.secondary = Some(TokenBalance {
                symbol: secondary.symbol.clone(),
                ..balance
            });
        } else {
            tracing::debug!("skipping token {} ({})", symbol, balance.contract_address.unwrap_or_default());
        }
    }
    Some(pair)
}

async fn native_from_rpc(ctx: &FetchContext, address: &str) -> Option<TokenBalance> {
    ctx.stats.inc_rpc_calls(1);
    match ctx.rpc.balance(address).await {
        Ok(raw) => Some(TokenBalance {
            symbol: ctx.chain.native.symbol.clone(),
            balance: format_units(raw, ctx.native_decimals()),
            decimals: ctx.native_decimals(),
            contract_address: None,
        }),
        Err(err) => {
            ctx.stats.inc_rpc_errors();
            tracing::warn!("native balance of {} unavailable: {}", address, err);
            None
        }
    }
}

/// Reads the secondary token over RPC. Nothing is reported when no contract
/// is deployed at the configured address.
async fn secondary_from_rpc(ctx: &FetchContext, address: &str) -> Option<TokenBalance> {
    let token = &ctx.chain.secondary_token;
    ctx.stats.inc_rpc_calls(1);
    match ctx.rpc.code(&token.address).await {
        Ok(code) if !code.is_empty() => {}
        Ok(_) => {
            tracing::warn!("no contract deployed at {}", token.address);
            return None;
        }
        Err(err) => {
            ctx.stats.inc_rpc_errors();
            tracing::warn!("code lookup for {} failed: {}", token.address, err);
            return None;
        }
    }

    ctx.stats.inc_rpc_calls(3);
    let raw = match erc20_balance_of(ctx.rpc.as_ref(), &token.address, address).await {
        Ok(raw) => raw,
        Err(err) => {
            ctx.stats.inc_rpc_errors();
            tracing::warn!("{} balanceOf failed: {}", token.symbol, err);
            return None;
        }
    };
    let decimals = erc20_decimals(ctx.rpc.as_ref(), &token.address)
        .await
        .ok()
        .flatten()
        .unwrap_or(token.decimals);
    if let Ok(Some(symbol)) = erc20_symbol(ctx.rpc.as_ref(), &token.address).await {
        if !symbol.eq_ignore_ascii_case(&token.symbol) {
            tracing::debug!("token at {} reports symbol {}", token.address, symbol);
        }
    }

    Some(TokenBalance {
        symbol: token.symbol.clone(),
        balance: format_units(raw, decimals),
        decimals,
        contract_address: Some(token.address.clone()),
    })
}

/// Native and secondary balances of `address`, native first. Both entries
/// are always present; a balance no source could provide is zero.
pub async fn fetch_wallet_balances(
    ctx: &FetchContext,
    raw_address: &str,
) -> Result<Vec<TokenBalance>, FetchError> {
    let address = validate_address(raw_address)?;
    let mut pair = ctx
        .explorer
        .probe(&[balance_path(&address)], ctx.tuning.listing_rest_timeout, |json| {
            parse_token_balances(ctx, json)
        })
        .await
        .unwrap_or_default();

    if pair.native.is_none() {
        pair.native = native_from_rpc(ctx, &address).await;
    }
    if pair.secondary.is_none() {
        pair.secondary = secondary_from_rpc(ctx, &address).await;
    }

    let native = pair.native.unwrap_or_else(|| TokenBalance {
        symbol: ctx.chain.native.symbol.clone(),
        balance: "0".to_string(),
        decimals: ctx.native_decimals(),
        contract_address: None,
    });
    let secondary = pair.secondary.unwrap_or_else(|| TokenBalance {
        symbol: ctx.chain.secondary_token.symbol.clone(),
        balance: "0".to_string(),
        decimals: ctx.chain.secondary_token.decimals,
        contract_address: Some(ctx.chain.secondary_token.address.clone()),
    });
    Ok(vec![native, secondary])
}

/// Record array of a wallet listing. Etherscan-style bodies only count when
/// they report success.
pub fn wallet_listing_items(json: &Value) -> Option<&Vec<Value>> {
    if json.get("result").is_some() {
        if let Some(status) = json.get("status").and_then(as_string) {
            if status != "1" {
                return None;
            }
        }
    }
    find_array(json, &["items", "result"], 1)
}

pub fn parse_wallet_listing(ctx: &FetchContext, json: &Value) -> Option<Vec<TransactionSummary>> {
    let items = wallet_listing_items(json)?;
    let txs: Vec<TransactionSummary> = items
        .iter()
        .take(WALLET_TX_WINDOW)
        .filter_map(|item| summary_from_rest(item, ctx.native_decimals(), ctx.rescale(), None))
        .collect();
    (!txs.is_empty()).then_some(txs)
}

/// Explorer history of `address`. The node keeps no per-account index, so
/// there is no RPC fallback and exhaustion yields an empty list.
pub async fn fetch_wallet_transactions(
    ctx: &FetchContext,
    raw_address: &str,
) -> Result<Vec<TransactionSummary>, FetchError> {
    let address = validate_address(raw_address)?;
    let txs = ctx
        .explorer
        .probe(&wallet_tx_paths(&address), ctx.tuning.listing_rest_timeout, |json| {
            parse_wallet_listing(ctx, json)
        })
        .await;
    match txs {
        Some(txs) => Ok(dedup_by_hash(txs)),
        None => {
            tracing::warn!("wallet-transactions: no explorer history for {}", address);
            Ok(Vec::new())
        }
    }
}
