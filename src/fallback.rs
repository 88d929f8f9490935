//! Ordered "first attempt that yields a value" combinators.
//!
//! Every fetcher is a chain of candidates (REST URLs, then RPC derivations).
//! Candidates are awaited strictly in order; a candidate that yields `None`
//! hands over to the next one and the chain stops at the first `Some`.

use std::future::Future;

use futures_util::future::BoxFuture;

/// A lazily started stage of a fallback chain.
pub type Attempt<'a, T> = BoxFuture<'a, Option<T>>;

/// Runs `attempt` for each candidate in order and returns the first `Some`.
pub async fn first_success<C, T, F, Fut>(candidates: impl IntoIterator<Item = C>, mut attempt: F) -> Option<T>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for candidate in candidates {
        if let Some(value) = attempt(candidate).await {
            return Some(value);
        }
    }
    None
}

/// Awaits named stages in order. Boxed futures do not start until polled,
/// so later stages cost nothing once an earlier one succeeds.
pub async fn first_of<T>(query: &str, stages: Vec<(&'static str, Attempt<'_, T>)>) -> Option<T> {
    for (name, stage) in stages {
        if let Some(value) = stage.await {
            tracing::info!("{} resolved via {}", query, name);
            return Some(value);
        }
        tracing::debug!("{}: {} yielded nothing", query, name);
    }
    tracing::warn!("{}: every source exhausted", query);
    None
}
