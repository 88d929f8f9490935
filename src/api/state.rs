use std::future::Future;
use std::sync::Arc;

use crate::chat::ChatService;
use crate::fetch::blocks::fetch_recent_blocks;
use crate::fetch::history::fetch_transaction_history;
use crate::fetch::stats::fetch_network_stats;
use crate::fetch::transactions::fetch_recent_transactions;
use crate::fetch::utilization::fetch_network_utilization;
use crate::fetch::FetchContext;
use crate::models::{
    BlockSummary, DailyTransactions, NetworkStats, NetworkUtilization, TokenBalance,
    TransactionDetail, TransactionSummary,
};
use crate::poll::{
    spawn_poller, PollConfig, Poller, QueryCache, QueryError, NETWORK_STATS, NETWORK_UTILIZATION,
    RECENT_BLOCKS, RECENT_TRANSACTIONS, TRANSACTION_HISTORY,
};

/// Shared state behind every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<FetchContext>,
    pub pollers: Arc<Pollers>,
    pub details: QueryCache<Option<TransactionDetail>>,
    pub balances: QueryCache<Vec<TokenBalance>>,
    pub wallet_txs: QueryCache<Vec<TransactionSummary>>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Starts the background pollers; must run inside a Tokio runtime.
    pub fn new(ctx: FetchContext, chat: ChatService) -> Self {
        let ctx = Arc::new(ctx);
        let pollers = Arc::new(Pollers::spawn(&ctx));
        Self {
            ctx,
            pollers,
            details: QueryCache::new(),
            balances: QueryCache::new(),
            wallet_txs: QueryCache::new(),
            chat: Arc::new(chat),
        }
    }
}

/// The five continuously refreshed dashboard queries.
pub struct Pollers {
    pub stats: Poller<NetworkStats>,
    pub blocks: Poller<Vec<BlockSummary>>,
    pub transactions: Poller<Vec<TransactionSummary>>,
    pub history: Poller<Vec<DailyTransactions>>,
    pub utilization: Poller<NetworkUtilization>,
}

fn poll<T, F, Fut>(schedule: PollConfig, ctx: &Arc<FetchContext>, fetch: F) -> Poller<T>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<FetchContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
{
    let ctx = ctx.clone();
    spawn_poller(schedule, move || fetch(ctx.clone()))
}

impl Pollers {
    pub fn spawn(ctx: &Arc<FetchContext>) -> Self {
        Self {
            stats: poll(NETWORK_STATS, ctx, |ctx| async move {
                Ok(fetch_network_stats(&ctx).await)
            }),
            blocks: poll(RECENT_BLOCKS, ctx, |ctx| async move {
                Ok(fetch_recent_blocks(&ctx).await)
            }),
            transactions: poll(RECENT_TRANSACTIONS, ctx, |ctx| async move {
                Ok(fetch_recent_transactions(&ctx).await)
            }),
            history: poll(TRANSACTION_HISTORY, ctx, |ctx| async move {
                Ok(fetch_transaction_history(&ctx).await)
            }),
            utilization: poll(NETWORK_UTILIZATION, ctx, |ctx| async move {
                fetch_network_utilization(&ctx)
                    .await
                    .ok_or_else(|| QueryError::retryable("latest block unavailable"))
            }),
        }
    }

    /// Triggers an immediate run of the poller named `key`. Returns false
    /// for unknown keys.
    pub fn refetch(&self, key: &str) -> bool {
        match key {
            k if k == self.stats.key() => self.stats.refetch(),
            k if k == self.blocks.key() => self.blocks.refetch(),
            k if k == self.transactions.key() => self.transactions.refetch(),
            k if k == self.history.key() => self.history.refetch(),
            k if k == self.utilization.key() => self.utilization.refetch(),
            _ => return false,
        }
        true
    }
}
