//! Single-transaction detail: explorer records first, then a reconstruction
//! from the transaction, its receipt and its block over RPC.

use ethers_core::types::U256;
use futures_util::FutureExt;
use serde_json::Value;

use crate::eth::{RpcBlock, RpcReceipt, RpcTransaction};
use crate::explorer::StatusPolicy;
use crate::fallback::{first_of, first_success, Attempt};
use crate::fetch::normalize::{
    classify_tx_type, display_value, now_secs, resolve_status, TX_BLOCK_NUMBER, TX_CONFIRMATIONS,
    TX_FROM, TX_HASH, TX_INPUT, TX_TIMESTAMP, TX_TO, TX_VALUE,
};
use crate::fetch::{validate_tx_hash, FetchContext, FetchError};
use crate::models::{DecodedInput, DecodedParameter, TokenInfo, TokenTransfer, TransactionDetail, TxStatus};
use crate::probe::{
    self, as_address, as_string, as_u256, as_u64, probe_address, probe_string, probe_timestamp,
    probe_u256, probe_u64, Rules,
};
use crate::units::{format_relative, format_units, native_display, GWEI_DECIMALS, WEI_DECIMALS};

const GAS_USED: Rules = &[&["gas_used"], &["gasUsed"], &["gas_used_raw"]];
const GAS_PRICE: Rules = &[&["gas_price"], &["gasPrice"], &["gas_price_raw"]];
const GAS_LIMIT: Rules = &[&["gas_limit"], &["gasLimit"], &["gas"], &["gas_raw"]];
const NONCE: Rules = &[&["nonce"], &["nonce_raw"]];
const TX_INDEX: Rules = &[&["transaction_index"], &["transactionIndex"], &["index"], &["position"]];
const BLOCK_HASH: Rules = &[&["block_hash"], &["blockHash"]];
const FEE: Rules = &[&["fee", "value"], &["fee"]];
const MAX_FEE: Rules = &[&["max_fee_per_gas"], &["maxFeePerGas"]];
const PRIORITY_FEE: Rules = &[&["max_priority_fee_per_gas"], &["maxPriorityFeePerGas"]];
const BASE_FEE: Rules = &[&["base_fee_per_gas"], &["baseFeePerGas"]];
const METHOD: Rules = &[&["method"]];
const CREATED_CONTRACT: Rules = &[&["created_contract"], &["contractAddress"]];
const REVERT_REASON: Rules = &[&["revert_reason"], &["revertReason"]];
const DECODED_CALL: Rules = &[&["method_call"], &["methodCall"]];
const DECODED_ID: Rules = &[&["method_id"], &["methodId"]];
const TRANSFER_VALUE: Rules = &[&["total", "value"], &["value"]];
const TRANSFER_DECIMALS: Rules = &[&["total", "decimals"]];
const TRANSFER_TYPE: Rules = &[&["type"]];
const TOKEN_ADDRESS: Rules = &[&["address_hash"], &["address"]];
const TOKEN_SYMBOL: Rules = &[&["symbol"]];
const TOKEN_NAME: Rules = &[&["name"]];
const TOKEN_DECIMALS: Rules = &[&["decimals"]];

/// Keys under which explorers wrap a single transaction, in lookup order.
const WRAPPERS: &[&[&str]] = &[
    &["transaction"],
    &["item"],
    &["data"],
    &["result"],
    &["summary", "transaction"],
];

const DEFAULT_TRANSFER_DECIMALS: u32 = 6;

pub fn detail_paths(hash: &str) -> Vec<String> {
    vec![
        format!("/api/v2/transactions/{}/summary", hash),
        format!("/api/v2/transactions/{}", hash),
        format!("/api/v2/transactions/{}?type=json", hash),
        format!("/api/v1/transactions/{}", hash),
        format!("/api/transactions/{}", hash),
        format!("/api?module=proxy&action=eth_getTransactionByHash&txhash={}", hash),
    ]
}

/// Finds the transaction object inside an explorer response.
pub fn locate_transaction(json: &Value) -> Option<&Value> {
    if probe::first(json, TX_HASH).is_some() {
        return Some(json);
    }
    let wrapped = |path: &&[&str]| probe::lookup(json, path).filter(|v| v.is_object());
    WRAPPERS
        .iter()
        .take(4)
        .find_map(wrapped)
        .or_else(|| json.as_array().and_then(|a| a.first()))
        .or_else(|| WRAPPERS.iter().skip(4).find_map(wrapped))
}

fn title_case(raw: &str) -> String {
    raw.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(as_string).collect())
        .unwrap_or_default()
}

fn decoded_input(tx: &Value) -> Option<DecodedInput> {
    let decoded = tx.get("decoded_input").filter(|v| v.is_object())?;
    let parameters = decoded
        .get("parameters")
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|p| DecodedParameter {
                    name: p.get("name").and_then(as_string).unwrap_or_default(),
                    param_type: p.get("type").and_then(as_string).unwrap_or_default(),
                    value: match p.get("value") {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    },
                })
                .collect()
        })
        .unwrap_or_default();
    Some(DecodedInput {
        method_call: probe_string(decoded, DECODED_CALL).unwrap_or_default(),
        method_id: probe_string(decoded, DECODED_ID).unwrap_or_default(),
        parameters,
    })
}

fn token_transfers(tx: &Value) -> Vec<TokenTransfer> {
    let transfers = match tx.get("token_transfers").and_then(Value::as_array) {
        Some(t) => t,
        None => return Vec::new(),
    };
    transfers
        .iter()
        .map(|transfer| {
            let token = transfer.get("token").cloned().unwrap_or(Value::Null);
            let decimals = probe_u64(transfer, TRANSFER_DECIMALS)
                .or_else(|| probe_u64(&token, TOKEN_DECIMALS))
                .map(|d| d as u32)
                .unwrap_or(DEFAULT_TRANSFER_DECIMALS);
            let raw = probe_u256(transfer, TRANSFER_VALUE).unwrap_or_default();
            TokenTransfer {
                from: transfer.get("from").and_then(as_address).unwrap_or_default(),
                to: transfer.get("to").and_then(as_address).unwrap_or_default(),
                token: TokenInfo {
                    address: probe_string(&token, TOKEN_ADDRESS).unwrap_or_default(),
                    symbol: probe_string(&token, TOKEN_SYMBOL).unwrap_or_else(|| "USDC".to_string()),
                    name: probe_string(&token, TOKEN_NAME).unwrap_or_else(|| "USD Coin".to_string()),
                    decimals,
                },
                value: format_units(raw, decimals),
                transfer_type: probe_string(transfer, TRANSFER_TYPE)
                    .unwrap_or_else(|| "token_transfer".to_string()),
            }
        })
        .collect()
}

/// Sum of the raw transfer totals, formatted with the first token's
/// decimals. `None` when the transfers carry no value.
fn transfer_total(tx: &Value) -> Option<String> {
    let transfers = tx.get("token_transfers").and_then(Value::as_array)?;
    let total = transfers
        .iter()
        .filter_map(|t| probe::lookup(t, &["total", "value"]).and_then(as_u256))
        .fold(U256::zero(), |acc, v| acc.saturating_add(v));
    if total.is_zero() {
        return None;
    }
    let decimals = transfers
        .first()
        .and_then(|t| probe::lookup(t, &["token", "decimals"]))
        .and_then(as_u64)
        .map(|d| d as u32)
        .unwrap_or(DEFAULT_TRANSFER_DECIMALS);
    Some(format_units(total, decimals))
}

/// Method label and type label from the explorer's method field. Bare
/// selectors are replaced by the decoded method name when one exists.
fn method_and_type(tx: &Value, decoded: Option<&DecodedInput>) -> Option<(String, String)> {
    let method = probe_string(tx, METHOD)?;
    if !method.starts_with("0x") {
        return Some((method.clone(), method));
    }
    match decoded.and_then(|d| d.method_call.split('(').next()).filter(|n| !n.is_empty()) {
        Some(name) => Some((name.to_string(), name.to_string())),
        None => Some((method, "Contract Call".to_string())),
    }
}

fn type_from_transaction_types(types: &[String]) -> Option<String> {
    types
        .iter()
        .find(|t| t.as_str() != "contract_call" && t.as_str() != "token_transfer")
        .or_else(|| types.first())
        .map(|t| title_case(t))
}

/// Builds a detail from an explorer record. The record must carry the
/// requested hash.
pub fn detail_from_rest(ctx: &FetchContext, json: &Value, hash: &str) -> Option<TransactionDetail> {
    let tx = locate_transaction(json)?;
    let record_hash = probe_string(tx, TX_HASH)?;
    if !record_hash.eq_ignore_ascii_case(hash) {
        return None;
    }
    let from = probe_address(tx, TX_FROM)?;
    let to = probe_address(tx, TX_TO);
    let input = probe_string(tx, TX_INPUT).unwrap_or_else(|| "0x".to_string());

    let transfers = token_transfers(tx);
    let mut value = display_value(probe::first(tx, TX_VALUE), ctx.native_decimals(), ctx.rescale());
    if value == "0" {
        if let Some(total) = transfer_total(tx) {
            value = total;
        }
    }

    let decoded = decoded_input(tx);
    let transaction_types = string_list(tx.get("transaction_types"));
    let created_contract = probe_address(tx, CREATED_CONTRACT);
    let method_type = method_and_type(tx, decoded.as_ref());
    let mut tx_type = match &method_type {
        Some((_, t)) => t.clone(),
        None => type_from_transaction_types(&transaction_types).unwrap_or_else(|| {
            if created_contract.is_some() {
                "Contract Creation".to_string()
            } else {
                classify_tx_type(to.as_deref(), &input).to_string()
            }
        }),
    };
    if !transfers.is_empty() {
        tx_type = "Token Transfer".to_string();
    }

    let gas_price = probe_u256(tx, GAS_PRICE).unwrap_or_default();
    let timestamp = probe_timestamp(tx, TX_TIMESTAMP).unwrap_or_else(now_secs);
    let gwei = |rules: Rules| probe_u256(tx, rules).map(|v| format_units(v, GWEI_DECIMALS));

    Some(TransactionDetail {
        hash: record_hash,
        from,
        to,
        value,
        timestamp,
        block_number: probe_u64(tx, TX_BLOCK_NUMBER).unwrap_or(0),
        status: resolve_status(tx),
        tx_type,
        formatted_time: format_relative(timestamp),
        gas_used: probe_u256(tx, GAS_USED).unwrap_or_default().to_string(),
        gas_price: format_units(gas_price, GWEI_DECIMALS),
        gas_price_raw: gas_price.to_string(),
        gas_limit: probe_u256(tx, GAS_LIMIT).unwrap_or_default().to_string(),
        nonce: probe_u64(tx, NONCE).unwrap_or(0),
        transaction_index: probe_u64(tx, TX_INDEX).unwrap_or(0),
        block_hash: probe_string(tx, BLOCK_HASH).unwrap_or_default(),
        input,
        confirmations: probe_u64(tx, TX_CONFIRMATIONS).filter(|c| *c > 0),
        fee: probe_u256(tx, FEE).map(|v| format_units(v, WEI_DECIMALS)),
        max_fee_per_gas: gwei(MAX_FEE),
        max_priority_fee_per_gas: gwei(PRIORITY_FEE),
        base_fee_per_gas: gwei(BASE_FEE),
        method: method_type.map(|(m, _)| m),
        decoded_input: decoded,
        token_transfers: transfers,
        created_contract,
        revert_reason: probe_string(tx, REVERT_REASON),
        transaction_types,
    })
}

/// Detail reconstructed from RPC objects. Without a receipt the transaction
/// is still pending.
pub fn detail_from_rpc(
    ctx: &FetchContext,
    tx: &RpcTransaction,
    receipt: Option<&RpcReceipt>,
    block: Option<&RpcBlock>,
) -> TransactionDetail {
    let timestamp = block.map(|b| b.timestamp).unwrap_or_else(now_secs);
    let gas_price = receipt
        .and_then(|r| r.effective_gas_price)
        .or(tx.gas_price)
        .unwrap_or_default();
    let gas_used = receipt.and_then(|r| r.gas_used);
    let status = match receipt.map(|r| r.success) {
        Some(Some(true)) => TxStatus::Success,
        Some(Some(false)) => TxStatus::Failed,
        _ => TxStatus::Pending,
    };
    let created_contract = receipt.and_then(|r| r.contract_address.clone());

    TransactionDetail {
        hash: tx.hash.clone(),
        from: tx.from.clone(),
        to: tx.to.clone(),
        value: native_display(tx.value, ctx.native_decimals(), ctx.rescale()),
        timestamp,
        block_number: receipt
            .and_then(|r| r.block_number)
            .or(tx.block_number)
            .unwrap_or(0),
        status,
        tx_type: classify_tx_type(tx.to.as_deref(), &tx.input).to_string(),
        formatted_time: format_relative(timestamp),
        gas_used: gas_used.unwrap_or_default().to_string(),
        gas_price: format_units(gas_price, GWEI_DECIMALS),
        gas_price_raw: gas_price.to_string(),
        gas_limit: tx.gas.to_string(),
        nonce: tx.nonce,
        transaction_index: receipt
            .map(|r| r.transaction_index)
            .or(tx.transaction_index)
            .unwrap_or(0),
        block_hash: receipt
            .and_then(|r| r.block_hash.clone())
            .or_else(|| tx.block_hash.clone())
            .unwrap_or_default(),
        input: tx.input.clone(),
        confirmations: None,
        fee: gas_used.map(|used| format_units(used.saturating_mul(gas_price), WEI_DECIMALS)),
        max_fee_per_gas: tx.max_fee_per_gas.map(|v| format_units(v, GWEI_DECIMALS)),
        max_priority_fee_per_gas: tx
            .max_priority_fee_per_gas
            .map(|v| format_units(v, GWEI_DECIMALS)),
        base_fee_per_gas: None,
        method: None,
        decoded_input: None,
        token_transfers: Vec::new(),
        created_contract,
        revert_reason: None,
        transaction_types: Vec::new(),
    }
}

async fn from_explorer(ctx: &FetchContext, hash: &str) -> Option<TransactionDetail> {
    let mut variants = vec![hash.to_string()];
    let lower = hash.to_ascii_lowercase();
    if lower != hash {
        variants.push(lower);
    }
    first_success(variants, |variant| async move {
        ctx.explorer
            .probe_with(
                &detail_paths(&variant),
                ctx.tuning.detail_rest_timeout,
                StatusPolicy::BelowServerError,
                |json| detail_from_rest(ctx, json, &variant),
            )
            .await
    })
    .await
}

async fn from_rpc(ctx: &FetchContext, hash: &str) -> Option<TransactionDetail> {
    ctx.stats.inc_rpc_fallbacks();
    ctx.stats.inc_rpc_calls(1);
    let tx = match ctx.rpc.transaction(hash).await {
        Ok(Some(tx)) if tx.hash.eq_ignore_ascii_case(hash) => tx,
        Ok(_) => return None,
        Err(err) => {
            ctx.stats.inc_rpc_errors();
            tracing::debug!("transaction {} unavailable over rpc: {}", hash, err);
            return None;
        }
    };

    ctx.stats.inc_rpc_calls(1);
    let receipt = match ctx.rpc.receipt(hash).await {
        Ok(receipt) => receipt,
        Err(err) => {
            ctx.stats.inc_rpc_errors();
            tracing::debug!("receipt {} unavailable: {}", hash, err);
            None
        }
    };

    let block_number = receipt
        .as_ref()
        .and_then(|r| r.block_number)
        .or(tx.block_number);
    let block = match block_number {
        Some(n) => ctx.block_header(n).await,
        None => None,
    };

    Some(detail_from_rpc(ctx, &tx, receipt.as_ref(), block.as_ref()))
}

/// Resolves one transaction. Malformed hashes are rejected before any
/// request; an unknown hash is `Ok(None)`.
pub async fn fetch_transaction_detail(
    ctx: &FetchContext,
    raw_hash: &str,
) -> Result<Option<TransactionDetail>, FetchError> {
    let hash = validate_tx_hash(raw_hash)?;
    let stages: Vec<(&'static str, Attempt<'_, TransactionDetail>)> = vec![
        ("explorer", from_explorer(ctx, &hash).boxed()),
        ("rpc", from_rpc(ctx, &hash).boxed()),
    ];
    Ok(first_of("transaction-details", stages).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locates_wrapped_records() {
        let root = json!({"hash": "0x1"});
        assert_eq!(locate_transaction(&root), Some(&root));

        let wrapped = json!({"item": {"hash": "0x2"}});
        assert_eq!(locate_transaction(&wrapped).unwrap()["hash"], "0x2");

        let proxy = json!({"jsonrpc": "2.0", "id": 1, "result": {"hash": "0x3"}});
        assert_eq!(locate_transaction(&proxy).unwrap()["hash"], "0x3");

        let arr = json!([{"hash": "0x4"}]);
        assert_eq!(locate_transaction(&arr).unwrap()["hash"], "0x4");

        let summary = json!({"summary": {"transaction": {"hash": "0x5"}}});
        assert_eq!(locate_transaction(&summary).unwrap()["hash"], "0x5");

        assert!(locate_transaction(&json!({"message": "Not found"})).is_none());
    }

    #[test]
    fn title_cases_transaction_types() {
        assert_eq!(title_case("coin_transfer"), "Coin Transfer");
        assert_eq!(
            type_from_transaction_types(&["contract_call".into(), "coin_transfer".into()]),
            Some("Coin Transfer".to_string())
        );
        assert_eq!(
            type_from_transaction_types(&["token_transfer".into()]),
            Some("Token Transfer".to_string())
        );
        assert_eq!(type_from_transaction_types(&[]), None);
    }

    #[test]
    fn transfer_values_and_totals() {
        let tx = json!({
            "token_transfers": [
                {
                    "from": {"hash": "0xa"},
                    "to": {"hash": "0xb"},
                    "token": {"address_hash": "0xt", "symbol": "EURC", "name": "Euro Coin", "decimals": "6"},
                    "total": {"value": "2500000", "decimals": "6"},
                    "type": "token_transfer"
                },
                {"from": "0xa", "to": "0xc", "total": {"value": "500000"}}
            ]
        });
        let transfers = token_transfers(&tx);
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].token.symbol, "EURC");
        assert_eq!(transfers[0].value, "2.5");
        assert_eq!(transfers[1].token.symbol, "USDC");
        assert_eq!(transfers[1].token.name, "USD Coin");
        assert_eq!(transfers[1].value, "0.5");
        assert_eq!(transfer_total(&tx).as_deref(), Some("3"));
    }

    #[test]
    fn decoded_selector_method() {
        let tx = json!({
            "method": "0x84a3bb6b12",
            "decoded_input": {
                "method_call": "onChainGM(address to)",
                "method_id": "0x84a3bb6b",
                "parameters": [{"name": "to", "type": "address", "value": "0xabc"}]
            }
        });
        let decoded = decoded_input(&tx);
        let (method, ty) = method_and_type(&tx, decoded.as_ref()).unwrap();
        assert_eq!(method, "onChainGM");
        assert_eq!(ty, "onChainGM");
        assert_eq!(decoded.unwrap().parameters[0].param_type, "address");

        let bare = json!({"method": "0x84a3bb6b"});
        assert_eq!(method_and_type(&bare, None).unwrap().1, "Contract Call");
    }
}
