//! Polling layer: whole-query retry, a keyed cache that shares in-flight
//! requests, and background pollers publishing their latest state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::fetch::FetchError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
    pub retryable: bool,
}

impl QueryError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<FetchError> for QueryError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidHash(_)
            | FetchError::InvalidAddress(_)
            | FetchError::WrongChain { .. } => QueryError::fatal(err.to_string()),
            FetchError::Upstream(_) => QueryError::retryable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error, or
    /// `retries` extra attempts have been spent.
    pub async fn run<T, F, Fut>(&self, label: &str, attempt: F) -> Result<T, QueryError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let mut tries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.retryable && tries < self.retries => {
                    tries += 1;
                    tracing::warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        label,
                        err,
                        tries,
                        self.retries,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Schedule of a background query.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub key: &'static str,
    pub interval: Duration,
    pub retry: RetryPolicy,
}

/// Freshness and retry settings of an on-demand query.
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    pub key: &'static str,
    pub stale: Duration,
    pub retry: RetryPolicy,
}

pub const NETWORK_STATS: PollConfig = PollConfig {
    key: "network-stats",
    interval: Duration::from_secs(5),
    retry: RetryPolicy::fixed(1, Duration::from_secs(2)),
};

pub const RECENT_BLOCKS: PollConfig = PollConfig {
    key: "recent-blocks",
    interval: Duration::from_secs(2),
    retry: RetryPolicy::fixed(2, Duration::from_millis(500)),
};

pub const RECENT_TRANSACTIONS: PollConfig = PollConfig {
    key: "recent-transactions",
    interval: Duration::from_secs(5),
    retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
};

pub const TRANSACTION_HISTORY: PollConfig = PollConfig {
    key: "transaction-history",
    interval: Duration::from_secs(30),
    retry: RetryPolicy::fixed(1, Duration::from_secs(2)),
};

pub const NETWORK_UTILIZATION: PollConfig = PollConfig {
    key: "network-utilization",
    interval: Duration::from_secs(2),
    retry: RetryPolicy::fixed(2, Duration::from_millis(500)),
};

pub const TRANSACTION_DETAILS: QueryConfig = QueryConfig {
    key: "transaction-details",
    stale: Duration::from_secs(30),
    retry: RetryPolicy::fixed(3, Duration::from_secs(2)),
};

pub const WALLET_BALANCE: QueryConfig = QueryConfig {
    key: "wallet-balance",
    stale: Duration::from_secs(5),
    retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
};

pub const WALLET_TRANSACTIONS: QueryConfig = QueryConfig {
    key: "wallet-transactions",
    stale: Duration::from_secs(30),
    retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub name: &'static str,
    pub param: Option<String>,
}

impl QueryKey {
    pub fn new(name: &'static str) -> Self {
        Self { name, param: None }
    }

    pub fn with_param(name: &'static str, param: impl Into<String>) -> Self {
        Self {
            name,
            param: Some(param.into()),
        }
    }
}

/// How long an on-demand entry survives without being read.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(10);

type SharedQuery<T> = Shared<BoxFuture<'static, Result<T, QueryError>>>;

struct Entry<T> {
    value: Option<T>,
    updated: Option<Instant>,
    last_used: Instant,
    in_flight: Option<SharedQuery<T>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            value: None,
            updated: None,
            last_used: Instant::now(),
            in_flight: None,
        }
    }
}

/// Last resolved value per key plus the request currently running for it.
///
/// Concurrent callers of one key await the same spawned request. The request
/// runs to completion and updates the cache even if every caller goes away.
/// Entries nobody has asked for within `gc_time` are dropped on the next
/// fetch, unless a request for them is still running.
pub struct QueryCache<T> {
    entries: Arc<Mutex<HashMap<QueryKey, Entry<T>>>>,
    gc_time: Duration,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            gc_time: self.gc_time,
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::with_gc_time(DEFAULT_GC_TIME)
    }
}

impl<T> QueryCache<T> {
    pub fn with_gc_time(gc_time: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            gc_time,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent successful value for `key`, however old.
    pub fn peek(&self, key: &QueryKey) -> Option<T> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).and_then(|e| e.value.clone()))
    }

    /// Drops the stored value so the next fetch goes upstream.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(entry) = entries.get_mut(key) {
                entry.updated = None;
            }
        }
    }

    /// Returns the cached value when younger than `stale`, otherwise joins
    /// or starts the upstream request for `key`.
    pub async fn fetch<F, Fut>(
        &self,
        key: QueryKey,
        stale: Duration,
        policy: RetryPolicy,
        make: F,
    ) -> Result<T, QueryError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
    {
        let query = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| QueryError::fatal("query cache poisoned"))?;
            let gc_time = self.gc_time;
            entries.retain(|_, e| e.in_flight.is_some() || e.last_used.elapsed() < gc_time);
            let entry = entries.entry(key.clone()).or_default();
            entry.last_used = Instant::now();
            if let (Some(value), Some(updated)) = (&entry.value, entry.updated) {
                if updated.elapsed() < stale {
                    return Ok(value.clone());
                }
            }
            if let Some(query) = entry.in_flight.clone() {
                query
            } else {
                let query = self.spawn_query(key, policy, make);
                entry.in_flight = Some(query.clone());
                query
            }
        };
        query.await
    }

    fn spawn_query<F, Fut>(&self, key: QueryKey, policy: RetryPolicy, make: F) -> SharedQuery<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
    {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let result = policy.run(key.name, &make).await;
            cache.settle(&key, &result);
            result
        });
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(QueryError::retryable(format!("query task failed: {}", e))))
        }
        .boxed()
        .shared()
    }

    fn settle(&self, key: &QueryKey, result: &Result<T, QueryError>) {
        if let Ok(mut entries) = self.entries.lock() {
            let entry = entries.entry(key.clone()).or_default();
            entry.in_flight = None;
            entry.last_used = Instant::now();
            match result {
                Ok(value) => {
                    entry.value = Some(value.clone());
                    entry.updated = Some(Instant::now());
                }
                Err(err) => tracing::warn!("{} failed, keeping previous value: {}", key.name, err),
            }
        }
    }
}

/// What a consumer sees of a polled query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub is_loading: bool,
    /// Unix milliseconds of the last successful poll.
    pub updated_at: Option<i64>,
}

impl<T> QueryState<T> {
    fn loading() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: true,
            updated_at: None,
        }
    }

    /// Last successful poll wins; a failure keeps the previous data.
    fn apply(&mut self, result: Result<T, QueryError>) {
        self.is_loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.updated_at = Some(Utc::now().timestamp_millis());
            }
            Err(err) => self.error = Some(err.message),
        }
    }
}

/// A running background query. Dropping the handle stops the poller.
pub struct Poller<T> {
    key: &'static str,
    state: watch::Receiver<QueryState<T>>,
    trigger: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T: Clone> Poller<T> {
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.clone()
    }

    /// Runs the query now instead of waiting for the next tick.
    pub fn refetch(&self) {
        self.trigger.notify_one();
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a loop running `fetch` every `schedule.interval`, starting immediately.
pub fn spawn_poller<T, F, Fut>(schedule: PollConfig, fetch: F) -> Poller<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
{
    let (tx, rx) = watch::channel(QueryState::loading());
    let trigger = Arc::new(Notify::new());
    let notified = trigger.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = notified.notified() => {
                    tracing::debug!("{} manual refetch", schedule.key);
                    ticker.reset();
                }
            }
            tx.send_modify(|s| s.is_loading = true);
            let result = schedule.retry.run(schedule.key, &fetch).await;
            tx.send_modify(|s| s.apply(result));
        }
    });

    Poller {
        key: schedule.key,
        state: rx,
        trigger,
        task,
    }
}
