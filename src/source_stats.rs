use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing where fetched data came from. One instance lives in
/// each fetch context and is served on `/stats/sources`.
#[derive(Debug)]
pub struct SourceStats {
    rest_hits: AtomicU64,
    rest_misses: AtomicU64,
    rpc_calls: AtomicU64,
    rpc_errors: AtomicU64,
    rpc_fallbacks: AtomicU64,
}

impl Default for SourceStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStats {
    pub const fn new() -> Self {
        Self {
            rest_hits: AtomicU64::new(0),
            rest_misses: AtomicU64::new(0),
            rpc_calls: AtomicU64::new(0),
            rpc_errors: AtomicU64::new(0),
            rpc_fallbacks: AtomicU64::new(0),
        }
    }

    pub fn inc_rest_hits(&self) {
        self.rest_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rest_misses(&self) {
        self.rest_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rpc_calls(&self, n: u64) {
        self.rpc_calls.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_rpc_errors(&self) {
        self.rpc_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A query fell back from REST to RPC derivation.
    pub fn inc_rpc_fallbacks(&self) {
        self.rpc_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            rest_hits: self.rest_hits.load(Ordering::Relaxed),
            rest_misses: self.rest_misses.load(Ordering::Relaxed),
            rpc_calls: self.rpc_calls.load(Ordering::Relaxed),
            rpc_errors: self.rpc_errors.load(Ordering::Relaxed),
            rpc_fallbacks: self.rpc_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SourceSnapshot {
    pub rest_hits: u64,
    pub rest_misses: u64,
    pub rpc_calls: u64,
    pub rpc_errors: u64,
    pub rpc_fallbacks: u64,
}
