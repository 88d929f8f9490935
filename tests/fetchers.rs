mod common;

use std::time::Duration;

use ethers_core::types::U256;
use serde_json::json;

use arc_scout::config::{Tuning, DEFAULT_SECONDARY_TOKEN_ADDRESS, NATIVE_PRECOMPILE_ADDRESS};
use arc_scout::eth::{RpcReceipt, RpcTransaction};
use arc_scout::fetch::blocks::fetch_recent_blocks;
use arc_scout::fetch::details::fetch_transaction_detail;
use arc_scout::fetch::history::fetch_transaction_history;
use arc_scout::fetch::stats::fetch_network_stats;
use arc_scout::fetch::transactions::fetch_recent_transactions;
use arc_scout::fetch::utilization::fetch_network_utilization;
use arc_scout::fetch::wallet::{fetch_wallet_balances, fetch_wallet_transactions};
use arc_scout::fetch::FetchError;
use arc_scout::models::TxStatus;

use common::*;

const WALLET: &str = "0x1111111111111111111111111111111111111111";

#[tokio::test]
async fn stats_survive_failing_explorer() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let tuning = Tuning {
        tps_sample_blocks: 11,
        ..Tuning::default()
    };
    let ctx = context_with(busy_chain(), &explorer, tuning);

    let stats = fetch_network_stats(&ctx).await;
    assert_eq!(stats.current_block, 1_000);
    assert_eq!(stats.total_blocks, 1_000);
    assert_eq!(stats.network_tps, 10.0);
    // 300 transactions over 11 blocks rounds to 27 per block.
    assert_eq!(stats.total_transactions, 27_000);
    assert_eq!(stats.daily_transactions, 1_570_909);
    assert!(stats.total_addresses > 0);
    assert!(stats.active_wallets > 0);
    assert_eq!(stats.dapps_count, 14);

    let sources = ctx.stats.snapshot();
    assert_eq!(sources.rest_hits, 0);
    assert!(sources.rest_misses > 0);
    handle.abort();
}

#[tokio::test]
async fn stats_without_head_are_default() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let ctx = context(FakeRpc::default(), &explorer);

    let stats = fetch_network_stats(&ctx).await;
    assert_eq!(stats.current_block, 0);
    assert_eq!(stats.total_transactions, 0);
    assert_eq!(stats.network_tps, 0.0);
    assert_eq!(stats.dapps_count, 14);
    handle.abort();
}

#[tokio::test]
async fn stats_prefer_explorer_counters() {
    let (explorer, handle) = spawn_explorer(vec![(
        "/api/v2/stats".to_string(),
        json!({
            "total_transactions": "5000000",
            "total_addresses": "42000",
            "transactions_today": "1200000"
        }),
    )])
    .await;
    let ctx = context(busy_chain(), &explorer);

    let stats = fetch_network_stats(&ctx).await;
    assert_eq!(stats.total_transactions, 5_000_000);
    assert_eq!(stats.total_addresses, 42_000);
    assert_eq!(stats.daily_transactions, 1_200_000);
    handle.abort();
}

#[tokio::test]
async fn blocks_are_newest_first_and_unique() {
    let (explorer, handle) = spawn_explorer(vec![(
        "/api/v2/blocks".to_string(),
        json!({"items": [
            {"height": 5, "hash": "0x05", "timestamp": "2026-01-01T00:00:05Z", "transaction_count": 2},
            {"height": 7, "hash": "0x07", "timestamp": "2026-01-01T00:00:07Z", "transaction_count": 1},
            {"height": 5, "hash": "0x05", "timestamp": "2026-01-01T00:00:05Z", "transaction_count": 2},
            {"height": 6, "hash": "0x06", "timestamp": "2026-01-01T00:00:06Z", "transaction_count": 0}
        ]}),
    )])
    .await;
    let ctx = context(FakeRpc::default(), &explorer);

    let numbers: Vec<u64> = fetch_recent_blocks(&ctx).await.iter().map(|b| b.number).collect();
    assert_eq!(numbers, vec![7, 6, 5]);
    handle.abort();
}

#[tokio::test]
async fn blocks_fall_back_to_rpc() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let ctx = context(busy_chain(), &explorer);

    let blocks = fetch_recent_blocks(&ctx).await;
    let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
    assert_eq!(numbers, (991..=1_000).rev().collect::<Vec<u64>>());
    assert_eq!(blocks[0].transaction_count, 30);
    assert_eq!(blocks[0].gas_limit, "30000000");
    assert_eq!(ctx.stats.snapshot().rpc_fallbacks, 1);
    handle.abort();
}

#[tokio::test]
async fn recent_transactions_are_deduplicated() {
    let hash = tx_hash(77);
    let (explorer, handle) = spawn_explorer(vec![(
        "/api/v2/transactions".to_string(),
        json!({"items": [
            {"hash": hash, "from": {"hash": address(1)}, "to": {"hash": address(2)},
             "value": "1000000", "timestamp": "2026-01-01T00:00:10Z", "block_number": 10, "status": "ok"},
            {"hash": hash.to_ascii_uppercase().replace("0X", "0x"), "from": {"hash": address(1)},
             "to": {"hash": address(2)}, "value": "1000000", "timestamp": "2026-01-01T00:00:10Z",
             "block_number": 10, "status": "ok"},
            {"hash": tx_hash(78), "from": {"hash": address(3)}, "to": null,
             "value": "0", "timestamp": "2026-01-01T00:00:20Z", "block_number": 11, "status": "error"}
        ]}),
    )])
    .await;
    let ctx = context(FakeRpc::default(), &explorer);

    let txs = fetch_recent_transactions(&ctx).await;
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].hash, tx_hash(78));
    assert_eq!(txs[0].tx_type, "Contract Creation");
    assert_eq!(txs[0].status, TxStatus::Failed);
    assert_eq!(txs[1].value, "1");
    assert_eq!(txs[1].status, TxStatus::Success);
    handle.abort();
}

#[tokio::test]
async fn recent_transactions_scan_rpc_when_explorer_fails() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let mut rpc = FakeRpc::with_head(10);
    let mut newest = block(10, BASE_TS + 20, 0);
    newest.transactions = vec![
        transfer(tx_hash(1), 1, 2, "0x"),
        transfer(tx_hash(2), 3, 4, "0x095ea7b30000000000000000"),
    ];
    let mut middle = block(9, BASE_TS + 10, 0);
    middle.transactions = vec![
        transfer(tx_hash(1), 1, 2, "0x"),
        transfer(tx_hash(3), 5, 6, "0xa9059cbb0000000000000000"),
    ];
    let mut oldest = block(8, BASE_TS, 0);
    oldest.transactions = vec![transfer(tx_hash(4), 7, 8, "0x")];
    // Below the scan ceiling of five blocks.
    let mut beyond = block(5, BASE_TS - 30, 0);
    beyond.transactions = vec![transfer(tx_hash(5), 9, 10, "0x")];
    for b in [newest, middle, oldest, beyond] {
        rpc.add_block(b);
    }
    rpc.receipts.insert(tx_hash(1), receipt(true));
    rpc.receipts.insert(tx_hash(2), receipt(false));
    rpc.receipts.insert(tx_hash(4), receipt(true));
    rpc.slow_receipts.insert(tx_hash(4));

    let tuning = Tuning {
        recent_tx_scan_ceiling: 5,
        receipt_timeout: Duration::from_millis(100),
        ..Tuning::default()
    };
    let ctx = context_with(rpc, &explorer, tuning);

    let txs = fetch_recent_transactions(&ctx).await;
    let hashes: Vec<String> = txs.iter().map(|t| t.hash.clone()).collect();
    assert_eq!(hashes, vec![tx_hash(1), tx_hash(2), tx_hash(3), tx_hash(4)]);
    let types: Vec<&str> = txs.iter().map(|t| t.tx_type.as_str()).collect();
    assert_eq!(types, vec!["Transfer", "Approve", "Transfer", "Transfer"]);
    let statuses: Vec<TxStatus> = txs.iter().map(|t| t.status).collect();
    assert_eq!(
        statuses,
        vec![TxStatus::Success, TxStatus::Failed, TxStatus::Pending, TxStatus::Pending]
    );
    let numbers: Vec<u64> = txs.iter().map(|t| t.block_number).collect();
    assert_eq!(numbers, vec![10, 10, 9, 8]);
    assert_eq!(txs[0].value, "2");
    assert!(ctx.stats.snapshot().rpc_fallbacks >= 1);
    handle.abort();
}

#[tokio::test]
async fn rpc_scan_stops_at_genesis() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let mut rpc = FakeRpc::with_head(1);
    rpc.add_block(block(0, BASE_TS, 1));
    rpc.add_block(block(1, BASE_TS + 2, 2));
    let ctx = context(rpc, &explorer);

    let txs = fetch_recent_transactions(&ctx).await;
    assert_eq!(txs.len(), 3);
    assert_eq!(txs.last().map(|t| t.block_number), Some(0));
    assert!(txs.iter().all(|t| t.status == TxStatus::Pending));
    handle.abort();
}

#[tokio::test]
async fn recent_transactions_from_block_listings() {
    let (explorer, handle) = spawn_explorer(vec![
        (
            "/api/v2/blocks".to_string(),
            json!({"items": [
                {"height": 5, "timestamp": "2026-01-01T00:01:00Z"},
                {"height": 4, "timestamp": "2026-01-01T00:00:58Z"}
            ]}),
        ),
        (
            "/api/v2/blocks/5/transactions".to_string(),
            json!({"items": [
                {"hash": tx_hash(50), "from": {"hash": address(1)}, "to": {"hash": address(2)},
                 "value": "3000000", "status": "ok"},
                {"hash": tx_hash(51), "from": {"hash": address(3)}, "to": {"hash": address(4)},
                 "value": "0", "status": "ok"}
            ]}),
        ),
    ])
    .await;
    // No head: the RPC scan cannot answer.
    let ctx = context(FakeRpc::default(), &explorer);

    let txs = fetch_recent_transactions(&ctx).await;
    assert_eq!(txs.len(), 2);
    assert!(txs.iter().all(|t| t.block_number == 5));
    assert!(txs.iter().all(|t| t.timestamp == BASE_TS + 60));
    assert!(txs.iter().all(|t| t.status == TxStatus::Success));
    assert_eq!(txs[0].hash, tx_hash(50));
    assert_eq!(txs[0].value, "3");
    handle.abort();
}

#[tokio::test]
async fn chain_id_must_match_configuration() {
    let ctx = context(FakeRpc::with_head(1), "http://127.0.0.1:9");
    assert!(ctx.verify_chain().await.is_ok());

    let rpc = FakeRpc {
        chain_id: Some(1),
        ..FakeRpc::with_head(1)
    };
    let ctx = context(rpc, "http://127.0.0.1:9");
    let err = ctx.verify_chain().await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::WrongChain {
            expected: 5_042_002,
            actual: 1
        }
    ));
}

#[tokio::test]
async fn detail_requires_matching_hash() {
    let wanted = tx_hash(0xabc);
    let other = tx_hash(0xdef);
    let (explorer, handle) = spawn_explorer(vec![(
        format!("/api/v2/transactions/{}", wanted),
        json!({"hash": other, "from": {"hash": address(9)}, "value": "5"}),
    )])
    .await;

    let mut rpc = busy_chain();
    rpc.transactions.insert(
        wanted.clone(),
        RpcTransaction {
            hash: wanted.clone(),
            from: address(1),
            to: Some(address(2)),
            value: U256::from(2_500_000u64),
            input: "0x".to_string(),
            gas: U256::from(21_000u64),
            gas_price: Some(U256::from(1_000_000_000u64)),
            block_number: Some(1_000),
            ..RpcTransaction::default()
        },
    );
    rpc.receipts.insert(
        wanted.clone(),
        RpcReceipt {
            block_number: Some(1_000),
            gas_used: Some(U256::from(21_000u64)),
            success: Some(true),
            ..RpcReceipt::default()
        },
    );
    let ctx = context(rpc, &explorer);

    let detail = fetch_transaction_detail(&ctx, &wanted).await.unwrap().unwrap();
    assert_eq!(detail.hash, wanted);
    assert_eq!(detail.value, "2.5");
    assert_eq!(detail.status, TxStatus::Success);
    assert_eq!(detail.gas_price, "1");
    assert_eq!(detail.fee.as_deref(), Some("0.000021"));
    assert_eq!(detail.timestamp, BASE_TS + 30);
    handle.abort();
}

#[tokio::test]
async fn detail_from_explorer_record() {
    let hash = tx_hash(0x123);
    let (explorer, handle) = spawn_explorer(vec![(
        format!("/api/v2/transactions/{}", hash),
        json!({
            "hash": hash,
            "from": {"hash": address(1)},
            "to": {"hash": address(2)},
            "value": "1000000",
            "status": "ok",
            "block_number": 900,
            "gas_used": "21000",
            "gas_price": "2000000000",
            "fee": {"type": "actual", "value": "42000000000000"},
            "transaction_types": ["coin_transfer"]
        }),
    )])
    .await;
    let ctx = context(FakeRpc::default(), &explorer);

    let detail = fetch_transaction_detail(&ctx, &hash).await.unwrap().unwrap();
    assert_eq!(detail.hash, hash);
    assert_eq!(detail.value, "1");
    assert_eq!(detail.tx_type, "Coin Transfer");
    assert_eq!(detail.gas_price, "2");
    assert_eq!(detail.fee.as_deref(), Some("0.000042"));
    assert_eq!(ctx.stats.snapshot().rpc_fallbacks, 0);
    handle.abort();
}

#[tokio::test]
async fn detail_rejects_malformed_and_misses_unknown() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let ctx = context(FakeRpc::with_head(1), &explorer);

    assert!(matches!(
        fetch_transaction_detail(&ctx, "0x12").await,
        Err(FetchError::InvalidHash(_))
    ));
    assert_eq!(ctx.stats.snapshot().rest_misses, 0);
    assert_eq!(fetch_transaction_detail(&ctx, &tx_hash(5)).await.unwrap(), None);
    handle.abort();
}

#[tokio::test]
async fn balances_pick_native_and_secondary() {
    let (explorer, handle) = spawn_explorer(vec![(
        format!("/api/v2/addresses/{}/token-balances", WALLET),
        json!([
            {"token": {"symbol": "FOO", "address": address(77), "decimals": "18"}, "value": "5"},
            {"token": {"symbol": "EURC", "address": DEFAULT_SECONDARY_TOKEN_ADDRESS, "decimals": "6"},
             "value": "2500000"},
            {"token": {"symbol": "USDC", "address": NATIVE_PRECOMPILE_ADDRESS, "decimals": "6"},
             "value": "1000000"}
        ]),
    )])
    .await;
    let ctx = context(FakeRpc::with_head(1), &explorer);

    let balances = fetch_wallet_balances(&ctx, WALLET).await.unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!((balances[0].symbol.as_str(), balances[0].balance.as_str()), ("USDC", "1"));
    assert_eq!((balances[1].symbol.as_str(), balances[1].balance.as_str()), ("EURC", "2.5"));
    handle.abort();
}

#[tokio::test]
async fn idle_wallet_has_zero_balances() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let ctx = context(FakeRpc::with_head(1), &explorer);

    let balances = fetch_wallet_balances(&ctx, WALLET).await.unwrap();
    let shape: Vec<(&str, &str)> = balances
        .iter()
        .map(|b| (b.symbol.as_str(), b.balance.as_str()))
        .collect();
    assert_eq!(shape, vec![("USDC", "0"), ("EURC", "0")]);

    assert!(matches!(
        fetch_wallet_balances(&ctx, "0x1234").await,
        Err(FetchError::InvalidAddress(_))
    ));
    handle.abort();
}

#[tokio::test]
async fn wallet_history_is_empty_when_explorer_fails() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let ctx = context(FakeRpc::with_head(1), &explorer);

    assert!(fetch_wallet_transactions(&ctx, WALLET).await.unwrap().is_empty());
    handle.abort();
}

#[tokio::test]
async fn utilization_of_latest_block() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let mut rpc = FakeRpc::with_head(1_000);
    let mut head = block(1_000, BASE_TS, 0);
    head.gas_used = U256::from(15_000_000u64);
    rpc.add_block(head);
    let ctx = context(rpc, &explorer);

    let usage = fetch_network_utilization(&ctx).await.unwrap();
    assert_eq!(usage.utilization, 50.0);
    assert_eq!(usage.current_block, 1_000);
    assert!(fetch_network_utilization(&context(FakeRpc::default(), &explorer)).await.is_none());
    handle.abort();
}

#[tokio::test]
async fn history_estimates_from_blocks() {
    let (explorer, handle) = spawn_failing_explorer().await;
    let ctx = context(busy_chain(), &explorer);

    let points = fetch_transaction_history(&ctx).await;
    assert_eq!(points.len(), 30);
    assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    // Only today is reachable from block 1000; earlier days fall before genesis.
    assert_eq!(points[29].transactions, 30 * 57_600);
    assert_eq!(points[0].transactions, 50_000);
    handle.abort();
}
