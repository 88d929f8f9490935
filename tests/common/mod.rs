#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use ethers_core::types::U256;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use arc_scout::config::{ChainConfig, Tuning, DEFAULT_CHAIN_ID};
use arc_scout::eth::{ChainRpc, RpcBlock, RpcError, RpcReceipt, RpcTransaction};
use arc_scout::fetch::FetchContext;

pub const BASE_TS: i64 = 1_767_225_600;

/// In-memory chain. Unknown blocks and transactions are `Ok(None)`; a missing
/// head makes `eth_blockNumber` fail. Receipts listed in `slow_receipts` take
/// a second to arrive.
#[derive(Default, Clone)]
pub struct FakeRpc {
    pub head: Option<u64>,
    pub blocks: BTreeMap<u64, RpcBlock>,
    pub transactions: HashMap<String, RpcTransaction>,
    pub receipts: HashMap<String, RpcReceipt>,
    pub balances: HashMap<String, U256>,
    pub slow_receipts: HashSet<String>,
    /// Reported by `eth_chainId`; the ARC Testnet id when unset.
    pub chain_id: Option<u64>,
}

impl FakeRpc {
    pub fn with_head(head: u64) -> Self {
        Self {
            head: Some(head),
            ..Self::default()
        }
    }

    pub fn add_block(&mut self, block: RpcBlock) {
        self.blocks.insert(block.number, block);
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        Ok(self.chain_id.unwrap_or(DEFAULT_CHAIN_ID))
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.head.ok_or(RpcError::NoEndpoint)
    }

    async fn block_with_txs(&self, number: u64) -> Result<Option<RpcBlock>, RpcError> {
        Ok(self.blocks.get(&number).cloned())
    }

    async fn block_header(&self, number: u64) -> Result<Option<RpcBlock>, RpcError> {
        Ok(self.blocks.get(&number).map(|b| RpcBlock {
            transactions: Vec::new(),
            ..b.clone()
        }))
    }

    async fn transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, RpcError> {
        Ok(self.transactions.get(&hash.to_ascii_lowercase()).cloned())
    }

    async fn receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, RpcError> {
        if self.slow_receipts.contains(&hash.to_ascii_lowercase()) {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        Ok(self.receipts.get(&hash.to_ascii_lowercase()).cloned())
    }

    async fn balance(&self, address: &str) -> Result<U256, RpcError> {
        Ok(self
            .balances
            .get(&address.to_ascii_lowercase())
            .copied()
            .unwrap_or_default())
    }

    async fn call(&self, _to: &str, _data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        Err(RpcError::NoEndpoint)
    }

    async fn code(&self, _address: &str) -> Result<Vec<u8>, RpcError> {
        Ok(Vec::new())
    }
}

pub fn address(n: u64) -> String {
    format!("0x{:040x}", n)
}

pub fn tx_hash(n: u64) -> String {
    format!("0x{:064x}", n)
}

/// Block `number` holding `tx_count` plain transfers between distinct
/// addresses.
pub fn block(number: u64, timestamp: i64, tx_count: usize) -> RpcBlock {
    let transactions: Vec<RpcTransaction> = (0..tx_count as u64)
        .map(|i| RpcTransaction {
            hash: tx_hash(number * 1_000 + i),
            from: address(number * 1_000 + i),
            to: Some(address(number * 1_000 + i + 500)),
            value: U256::from(1_000_000u64),
            input: "0x".to_string(),
            gas: U256::from(21_000u64),
            block_number: Some(number),
            ..RpcTransaction::default()
        })
        .collect();
    RpcBlock {
        number,
        hash: Some(tx_hash(number)),
        timestamp,
        gas_used: U256::from(21_000u64 * tx_count as u64),
        gas_limit: U256::from(30_000_000u64),
        miner: Some(address(1)),
        transaction_count: tx_count,
        transactions,
    }
}

pub fn transfer(hash: String, from: u64, to: u64, input: &str) -> RpcTransaction {
    RpcTransaction {
        hash,
        from: address(from),
        to: Some(address(to)),
        value: U256::from(2_000_000u64),
        input: input.to_string(),
        gas: U256::from(50_000u64),
        ..RpcTransaction::default()
    }
}

pub fn receipt(success: bool) -> RpcReceipt {
    RpcReceipt {
        success: Some(success),
        ..RpcReceipt::default()
    }
}

/// Head 1000; blocks 991..=1000 carry 30 transactions each and block 990
/// none, three seconds apart. 300 transactions over a 30 second span.
pub fn busy_chain() -> FakeRpc {
    let mut rpc = FakeRpc::with_head(1_000);
    for n in 990..=1_000u64 {
        let count = if n == 990 { 0 } else { 30 };
        rpc.add_block(block(n, BASE_TS + 3 * (n as i64 - 990), count));
    }
    rpc
}

pub fn context(rpc: FakeRpc, explorer: &str) -> FetchContext {
    context_with(rpc, explorer, Tuning::default())
}

pub fn context_with(rpc: FakeRpc, explorer: &str, tuning: Tuning) -> FetchContext {
    let mut chain = ChainConfig::arc_testnet();
    chain.explorer_urls = vec![explorer.to_string()];
    FetchContext::new(Arc::new(rpc), chain, tuning).unwrap()
}

async fn serve(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, app);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (base_url, handle)
}

/// Explorer answering the given paths (query strings ignored) and 404 for
/// everything else.
pub async fn spawn_explorer(routes: Vec<(String, Value)>) -> (String, JoinHandle<()>) {
    let routes: Arc<HashMap<String, Value>> = Arc::new(routes.into_iter().collect());
    let app = Router::new().fallback(move |uri: Uri| {
        let routes = routes.clone();
        async move {
            match routes.get(uri.path()) {
                Some(body) => (StatusCode::OK, Json(body.clone())),
                None => (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))),
            }
        }
    });
    serve(app).await
}

/// Explorer that fails every request with a 500.
pub async fn spawn_failing_explorer() -> (String, JoinHandle<()>) {
    let app = Router::new().fallback(|| async {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Internal Server Error"})),
        )
    });
    serve(app).await
}
