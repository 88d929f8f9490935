use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures_util::stream::{self, StreamExt};

use crate::eth::RpcBlock;
use crate::fetch::FetchContext;

/// Per-fetch memo of full blocks so the throughput, daily, address and
/// active-wallet estimates never request the same block twice.
pub struct BlockSampler<'a> {
    ctx: &'a FetchContext,
    memo: Mutex<HashMap<u64, Option<Arc<RpcBlock>>>>,
}

impl<'a> BlockSampler<'a> {
    pub fn new(ctx: &'a FetchContext) -> Self {
        Self {
            ctx,
            memo: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, number: u64) -> Option<Option<Arc<RpcBlock>>> {
        self.memo
            .lock()
            .ok()
            .and_then(|memo| memo.get(&number).cloned())
    }

    pub async fn block(&self, number: u64) -> Option<Arc<RpcBlock>> {
        if let Some(hit) = self.cached(number) {
            return hit;
        }
        let block = self.ctx.block_with_txs(number).await.map(Arc::new);
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(number, block.clone());
        }
        block
    }

    /// Fetches `numbers` with bounded concurrency and returns the blocks that
    /// exist, in the order requested.
    pub async fn sample(&self, numbers: Vec<u64>) -> Vec<Arc<RpcBlock>> {
        let concurrency = self.ctx.tuning.scan_concurrency.max(1);
        stream::iter(numbers)
            .map(|n| self.block(n))
            .buffered(concurrency)
            .filter_map(|b| async move { b })
            .collect()
            .await
    }

    /// Up to `count` blocks counting down from `latest`, never below zero.
    pub async fn recent(&self, latest: u64, count: u64) -> Vec<Arc<RpcBlock>> {
        self.sample(descending(latest, count)).await
    }

    pub fn memoized(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }
}

/// `latest, latest - 1, ...`, `count` numbers at most, stopping at genesis.
pub fn descending(latest: u64, count: u64) -> Vec<u64> {
    (0..count)
        .map_while(|i| latest.checked_sub(i))
        .collect()
}

/// Unique lowercase sender and recipient addresses across `blocks`.
pub fn unique_addresses(blocks: &[Arc<RpcBlock>]) -> HashSet<String> {
    let mut seen = HashSet::new();
    for block in blocks {
        for tx in &block.transactions {
            seen.insert(tx.from.to_ascii_lowercase());
            if let Some(to) = &tx.to {
                seen.insert(to.to_ascii_lowercase());
            }
        }
    }
    seen
}
