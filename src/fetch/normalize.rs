//! Conversion of heterogeneous explorer records and raw RPC objects into the
//! canonical summaries.

use chrono::Utc;
use serde_json::Value;

use crate::eth::{RpcBlock, RpcTransaction};
use crate::models::{BlockSummary, TransactionSummary, TxStatus};
use crate::probe::{
    self, as_u256, probe_address, probe_string, probe_timestamp, probe_u256, probe_u64, Rules,
};
use crate::units::{format_relative, native_display, normalize_decimal, Rescale};

pub const SELECTOR_TRANSFER: &str = "0xa9059cbb";
pub const SELECTOR_APPROVE: &str = "0x095ea7b3";
pub const SELECTOR_SWAP_EXACT_ETH: &str = "0x7ff36ab5";
pub const SELECTOR_SWAP_EXACT_TOKENS: &str = "0x38ed1739";

pub const BLOCK_NUMBER: Rules = &[&["number"], &["block_number"], &["height"]];
pub const BLOCK_HASH: Rules = &[&["hash"], &["block_hash"], &["blockHash"], &["header", "hash"]];
pub const BLOCK_TIMESTAMP: Rules = &[&["timestamp"], &["block_timestamp"]];
pub const BLOCK_TX_COUNT: Rules = &[&["transaction_count"], &["transactions_count"], &["tx_count"]];
pub const BLOCK_GAS_USED: Rules = &[&["gas_used"], &["gasUsed"]];
pub const BLOCK_GAS_LIMIT: Rules = &[&["gas_limit"], &["gasLimit"]];
pub const BLOCK_MINER: Rules = &[&["miner"], &["author"]];

pub const TX_HASH: Rules = &[&["hash"], &["tx_hash"], &["transaction_hash"], &["transactionHash"]];
pub const TX_FROM: Rules = &[&["from"], &["from_address"], &["from_hash"]];
pub const TX_TO: Rules = &[&["to"], &["to_address"], &["to_hash"]];
pub const TX_VALUE: Rules = &[&["value"]];
pub const TX_TIMESTAMP: Rules = &[&["timestamp"], &["block_timestamp"], &["timeStamp"]];
pub const TX_BLOCK_NUMBER: Rules = &[&["block_number"], &["blockNumber"], &["block"], &["block_height"]];
pub const TX_STATUS: Rules = &[&["status"], &["result"], &["txreceipt_status"], &["success"]];
pub const TX_INPUT: Rules = &[&["input"], &["raw_input"], &["data"], &["input_data"]];
pub const TX_METHOD: Rules = &[&["method"]];
pub const TX_CONFIRMATIONS: Rules = &[&["confirmations"]];

/// Type label from the first four bytes of call data.
pub fn classify_tx_type(to: Option<&str>, input: &str) -> &'static str {
    if to.map_or(true, |t| t.trim().is_empty()) {
        return "Contract Creation";
    }
    let input = input.trim();
    if input.len() <= 2 || input == "0x" {
        return "Transfer";
    }
    match input.get(..10).map(str::to_ascii_lowercase).as_deref() {
        Some(SELECTOR_TRANSFER) => "Transfer",
        Some(SELECTOR_APPROVE) => "Approve",
        Some(SELECTOR_SWAP_EXACT_ETH) | Some(SELECTOR_SWAP_EXACT_TOKENS) => "Swap",
        _ => "Contract Call",
    }
}

/// Maps one raw status value; `None` when the value says nothing definite.
pub fn status_from_value(value: &Value) -> Option<TxStatus> {
    match value {
        Value::Bool(true) => Some(TxStatus::Success),
        Value::Bool(false) => Some(TxStatus::Failed),
        Value::Number(n) => match n.as_u64() {
            Some(1) => Some(TxStatus::Success),
            Some(0) => Some(TxStatus::Failed),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" | "1" => Some(TxStatus::Success),
            "failed" | "error" | "0" => Some(TxStatus::Failed),
            _ => None,
        },
        _ => None,
    }
}

/// Status of an explorer record: the first definite status field, then a
/// positive confirmation count, otherwise pending.
pub fn resolve_status(record: &Value) -> TxStatus {
    TX_STATUS
        .iter()
        .filter_map(|path| probe::lookup(record, path))
        .find_map(status_from_value)
        .or_else(|| {
            probe_u64(record, TX_CONFIRMATIONS)
                .filter(|c| *c > 0)
                .map(|_| TxStatus::Success)
        })
        .unwrap_or(TxStatus::Pending)
}

/// Display value of a native amount: pre-formatted decimals pass through,
/// raw fixed-point integers are converted, anything else is `"0"`.
pub fn display_value(value: Option<&Value>, decimals: u32, rescale: Rescale) -> String {
    let value = match value {
        Some(v) => v,
        None => return "0".to_string(),
    };
    let preformatted = match value {
        Value::String(s) => s.contains('.'),
        Value::Number(n) => n.is_f64(),
        _ => false,
    };
    if preformatted {
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return normalize_decimal(&raw);
    }
    match as_u256(value) {
        Some(raw) => native_display(raw, decimals, rescale),
        None => "0".to_string(),
    }
}

/// Method name reported by the explorer, ignoring bare selectors.
pub fn method_name(record: &Value) -> Option<String> {
    probe_string(record, TX_METHOD).filter(|m| !m.starts_with("0x"))
}

pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

pub fn block_from_rest(record: &Value) -> Option<BlockSummary> {
    let number = probe_u64(record, BLOCK_NUMBER)?;
    let timestamp = probe_timestamp(record, BLOCK_TIMESTAMP).unwrap_or_else(now_secs);
    Some(BlockSummary {
        number,
        hash: probe_string(record, BLOCK_HASH).unwrap_or_default(),
        timestamp,
        transaction_count: probe_u64(record, BLOCK_TX_COUNT).unwrap_or(0),
        gas_used: probe_u256(record, BLOCK_GAS_USED)
            .unwrap_or_default()
            .to_string(),
        gas_limit: probe_u256(record, BLOCK_GAS_LIMIT)
            .unwrap_or_default()
            .to_string(),
        miner: probe_address(record, BLOCK_MINER).unwrap_or_default(),
        formatted_time: format_relative(timestamp),
    })
}

pub fn block_from_rpc(block: &RpcBlock) -> BlockSummary {
    BlockSummary {
        number: block.number,
        hash: block.hash.clone().unwrap_or_default(),
        timestamp: block.timestamp,
        transaction_count: block.transaction_count as u64,
        gas_used: block.gas_used.to_string(),
        gas_limit: block.gas_limit.to_string(),
        miner: block.miner.clone().unwrap_or_default(),
        formatted_time: format_relative(block.timestamp),
    }
}

/// Normalizes one listing record. Records without a hash or a sender are
/// dropped. `fallback_timestamp` covers listings nested under a block.
pub fn summary_from_rest(
    record: &Value,
    decimals: u32,
    rescale: Rescale,
    fallback_timestamp: Option<i64>,
) -> Option<TransactionSummary> {
    let hash = probe_string(record, TX_HASH)?;
    let from = probe_address(record, TX_FROM)?;
    let to = probe_address(record, TX_TO);
    let input = probe_string(record, TX_INPUT).unwrap_or_default();
    let tx_type = method_name(record)
        .unwrap_or_else(|| classify_tx_type(to.as_deref(), &input).to_string());
    let timestamp = probe_timestamp(record, TX_TIMESTAMP)
        .or(fallback_timestamp)
        .unwrap_or_else(now_secs);

    Some(TransactionSummary {
        hash,
        from,
        to,
        value: display_value(probe::first(record, TX_VALUE), decimals, rescale),
        timestamp,
        block_number: probe_u64(record, TX_BLOCK_NUMBER).unwrap_or(0),
        status: resolve_status(record),
        tx_type,
        formatted_time: format_relative(timestamp),
    })
}

pub fn summary_from_rpc(
    tx: &RpcTransaction,
    block: &RpcBlock,
    status: TxStatus,
    decimals: u32,
    rescale: Rescale,
) -> TransactionSummary {
    TransactionSummary {
        hash: tx.hash.clone(),
        from: tx.from.clone(),
        to: tx.to.clone(),
        value: native_display(tx.value, decimals, rescale),
        timestamp: block.timestamp,
        block_number: block.number,
        status,
        tx_type: classify_tx_type(tx.to.as_deref(), &tx.input).to_string(),
        formatted_time: format_relative(block.timestamp),
    }
}

/// Keeps the first occurrence of every hash, compared case-insensitively.
pub fn dedup_by_hash(txs: Vec<TransactionSummary>) -> Vec<TransactionSummary> {
    let mut seen = std::collections::HashSet::new();
    txs.into_iter()
        .filter(|tx| seen.insert(tx.hash.to_ascii_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::U256;
    use serde_json::json;

    const ARC: Rescale = Rescale {
        threshold: 1_000.0,
        exponent: 12,
    };

    #[test]
    fn selector_table() {
        let to = Some("0xabc");
        assert_eq!(classify_tx_type(to, "0xa9059cbb0000"), "Transfer");
        assert_eq!(classify_tx_type(to, "0x095ea7b30000"), "Approve");
        assert_eq!(classify_tx_type(to, "0x7ff36ab50000"), "Swap");
        assert_eq!(classify_tx_type(to, "0x38ED17390000"), "Swap");
        assert_eq!(classify_tx_type(to, "0xdeadbeef"), "Contract Call");
        assert_eq!(classify_tx_type(to, "0x"), "Transfer");
        assert_eq!(classify_tx_type(to, ""), "Transfer");
        assert_eq!(classify_tx_type(None, "0x6080"), "Contract Creation");
    }

    #[test]
    fn status_spellings() {
        assert_eq!(resolve_status(&json!({"status": "ok"})), TxStatus::Success);
        assert_eq!(resolve_status(&json!({"result": "success"})), TxStatus::Success);
        assert_eq!(resolve_status(&json!({"status": 1})), TxStatus::Success);
        assert_eq!(resolve_status(&json!({"txreceipt_status": "0"})), TxStatus::Failed);
        assert_eq!(resolve_status(&json!({"status": "error"})), TxStatus::Failed);
        assert_eq!(resolve_status(&json!({"success": false})), TxStatus::Failed);
        assert_eq!(resolve_status(&json!({"confirmations": 3})), TxStatus::Success);
        assert_eq!(resolve_status(&json!({"status": null})), TxStatus::Pending);
        assert_eq!(resolve_status(&json!({})), TxStatus::Pending);
    }

    #[test]
    fn display_value_forms() {
        assert_eq!(display_value(Some(&json!("1000000")), 6, ARC), "1");
        assert_eq!(display_value(Some(&json!(2_500_000)), 6, ARC), "2.5");
        assert_eq!(display_value(Some(&json!("12.50")), 6, ARC), "12.5");
        assert_eq!(display_value(Some(&json!("garbage")), 6, ARC), "0");
        assert_eq!(display_value(None, 6, ARC), "0");
        assert_eq!(
            display_value(Some(&json!("1500000000000000000")), 6, ARC),
            "1.5"
        );
    }

    #[test]
    fn rest_summary_from_blockscout_item() {
        let item = json!({
            "hash": "0xaaa",
            "from": {"hash": "0xfrom"},
            "to": {"hash": "0xto"},
            "value": "3000000",
            "timestamp": "2025-12-28T16:48:07.000000Z",
            "block_number": 77,
            "status": "ok",
            "method": "transfer",
            "raw_input": "0xa9059cbb"
        });
        let tx = summary_from_rest(&item, 6, ARC, None).unwrap();
        assert_eq!(tx.from, "0xfrom");
        assert_eq!(tx.to.as_deref(), Some("0xto"));
        assert_eq!(tx.value, "3");
        assert_eq!(tx.timestamp, 1_766_940_487);
        assert_eq!(tx.block_number, 77);
        assert_eq!(tx.status, TxStatus::Success);
        assert_eq!(tx.tx_type, "transfer");
    }

    #[test]
    fn rest_summary_requires_hash_and_sender() {
        assert!(summary_from_rest(&json!({"from": "0x1"}), 6, ARC, None).is_none());
        assert!(summary_from_rest(&json!({"hash": "0x1"}), 6, ARC, None).is_none());
    }

    #[test]
    fn selector_method_falls_back_to_classification() {
        let item = json!({"hash": "0x1", "from": "0x2", "to": "0x3", "method": "0x095ea7b3", "input": "0x095ea7b3"});
        let tx = summary_from_rest(&item, 6, ARC, Some(100)).unwrap();
        assert_eq!(tx.tx_type, "Approve");
        assert_eq!(tx.timestamp, 100);
    }

    #[test]
    fn block_from_rest_fields() {
        let item = json!({
            "height": 500,
            "hash": "0xb",
            "timestamp": 1_700_000_000,
            "tx_count": 4,
            "gas_used": "21000",
            "gas_limit": "30000000",
            "miner": {"hash": "0xminer"}
        });
        let block = block_from_rest(&item).unwrap();
        assert_eq!(block.number, 500);
        assert_eq!(block.transaction_count, 4);
        assert_eq!(block.gas_used, "21000");
        assert_eq!(block.miner, "0xminer");
        assert!(block_from_rest(&json!({"hash": "0xb"})).is_none());
    }

    #[test]
    fn rpc_summary_uses_block_context() {
        let block = RpcBlock {
            number: 9,
            timestamp: 1_700_000_000,
            ..Default::default()
        };
        let tx = RpcTransaction {
            hash: "0x1".into(),
            from: "0x2".into(),
            to: None,
            value: U256::from(1_000_000u64),
            input: "0x6080".into(),
            ..Default::default()
        };
        let summary = summary_from_rpc(&tx, &block, TxStatus::Pending, 6, ARC);
        assert_eq!(summary.tx_type, "Contract Creation");
        assert_eq!(summary.value, "1");
        assert_eq!(summary.block_number, 9);
    }

    #[test]
    fn dedup_keeps_first() {
        let make = |hash: &str, block: u64| TransactionSummary {
            hash: hash.to_string(),
            from: "0x1".into(),
            to: None,
            value: "0".into(),
            timestamp: 0,
            block_number: block,
            status: TxStatus::Pending,
            tx_type: "Transfer".into(),
            formatted_time: String::new(),
        };
        let out = dedup_by_hash(vec![make("0xAB", 1), make("0xab", 2), make("0xcd", 3)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].block_number, 1);
    }
}
