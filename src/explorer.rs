use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use crate::fallback::first_success;
use crate::source_stats::SourceStats;

#[derive(thiserror::Error, Debug)]
pub enum ExplorerError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("{url} did not return JSON: {reason}")]
    Decode { url: String, reason: String },
}

/// Which HTTP statuses still get their body parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    SuccessOnly,
    /// Some explorers put the record in 4xx bodies; only 5xx is discarded.
    BelowServerError,
}

/// GET-only client for a Blockscout-shaped REST API served from one or more
/// base URLs.
#[derive(Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    bases: Vec<String>,
    stats: Arc<SourceStats>,
}

impl ExplorerClient {
    pub fn new(bases: Vec<String>, stats: Arc<SourceStats>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("arc-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let bases = bases
            .into_iter()
            .map(|b| b.trim_end_matches('/').to_string())
            .collect();
        Ok(Self { http, bases, stats })
    }

    /// Every base URL joined with every path, base-major: all paths are tried
    /// against the first base before the second base is touched.
    pub fn candidates<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        self.bases
            .iter()
            .flat_map(|base| paths.iter().map(move |p| format!("{}{}", base, p.as_ref())))
            .collect()
    }

    pub async fn get_json_with(
        &self,
        url: &str,
        timeout: Duration,
        policy: StatusPolicy,
    ) -> Result<Value, ExplorerError> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport(url, e))?;

        let status = response.status();
        let accepted = match policy {
            StatusPolicy::SuccessOnly => status.is_success(),
            StatusPolicy::BelowServerError => !status.is_server_error(),
        };
        if !accepted {
            return Err(ExplorerError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport(url, e))?;
        serde_json::from_slice(&body).map_err(|e| ExplorerError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Walks the candidate URLs for `paths` and returns the first body that
    /// `extract` turns into a value. Failed or unusable responses advance the
    /// chain.
    pub async fn probe<S, T, F>(&self, paths: &[S], timeout: Duration, extract: F) -> Option<T>
    where
        S: AsRef<str>,
        F: Fn(&Value) -> Option<T>,
    {
        self.probe_with(paths, timeout, StatusPolicy::SuccessOnly, extract)
            .await
    }

    pub async fn probe_with<S, T, F>(
        &self,
        paths: &[S],
        timeout: Duration,
        policy: StatusPolicy,
        extract: F,
    ) -> Option<T>
    where
        S: AsRef<str>,
        F: Fn(&Value) -> Option<T>,
    {
        let extract = &extract;
        first_success(self.candidates(paths), |url| async move {
            match self.get_json_with(&url, timeout, policy).await {
                Ok(body) => match extract(&body) {
                    Some(value) => {
                        tracing::debug!("explorer hit: {}", url);
                        self.stats.inc_rest_hits();
                        Some(value)
                    }
                    None => {
                        tracing::debug!("explorer body unusable: {}", url);
                        self.stats.inc_rest_misses();
                        None
                    }
                },
                Err(err) => {
                    tracing::debug!("explorer miss: {}", err);
                    self.stats.inc_rest_misses();
                    None
                }
            }
        })
        .await
    }
}

fn classify_transport(url: &str, err: reqwest::Error) -> ExplorerError {
    if err.is_timeout() {
        ExplorerError::Timeout {
            url: url.to_string(),
        }
    } else {
        ExplorerError::Transport {
            url: url.to_string(),
            source: err,
        }
    }
}
