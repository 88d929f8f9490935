//! Multi-source fetchers. Each one walks an ordered chain of explorer REST
//! candidates and falls back to deriving the same data over JSON-RPC.

pub mod blocks;
pub mod details;
pub mod history;
pub mod normalize;
pub mod sampler;
pub mod stats;
pub mod transactions;
pub mod utilization;
pub mod wallet;

use std::sync::Arc;

use crate::config::{ChainConfig, Config, Tuning};
use crate::models::{ChainInfo, NativeCurrencyInfo};
use crate::eth::{ChainRpc, EthClient, RpcBlock, RpcError};
use crate::explorer::ExplorerClient;
use crate::source_stats::SourceStats;
use crate::units::Rescale;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("invalid transaction hash {0:?}")]
    InvalidHash(String),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("RPC endpoint serves chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },
}

impl From<RpcError> for FetchError {
    fn from(err: RpcError) -> Self {
        FetchError::Upstream(err.to_string())
    }
}

/// Clients, chain description and tuning shared by every fetcher. Built once
/// at start-up and passed by reference.
pub struct FetchContext {
    pub rpc: Arc<dyn ChainRpc>,
    pub explorer: ExplorerClient,
    pub chain: ChainConfig,
    pub tuning: Tuning,
    pub stats: Arc<SourceStats>,
}

impl FetchContext {
    pub fn new(rpc: Arc<dyn ChainRpc>, chain: ChainConfig, tuning: Tuning) -> Result<Self, FetchError> {
        let stats = Arc::new(SourceStats::new());
        let explorer = ExplorerClient::new(chain.explorer_urls.clone(), stats.clone())
            .map_err(|e| FetchError::Upstream(format!("explorer client: {}", e)))?;
        Ok(Self {
            rpc,
            explorer,
            chain,
            tuning,
            stats,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let rpc = EthClient::new(&config.chain.rpc_urls, config.tuning.rpc_timeout)?
            .with_retries(config.tuning.rpc_retries, config.tuning.rpc_retry_delay);
        Self::new(Arc::new(rpc), config.chain.clone(), config.tuning.clone())
    }

    pub fn rescale(&self) -> Rescale {
        Rescale {
            threshold: self.tuning.value_rescale_threshold,
            exponent: self.tuning.value_rescale_exponent,
        }
    }

    pub fn native_decimals(&self) -> u32 {
        self.chain.native.decimals
    }

    pub fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            chain_id: self.chain.chain_id,
            chain_name: self.chain.chain_name.clone(),
            native_currency: NativeCurrencyInfo {
                name: self.chain.native.name.clone(),
                symbol: self.chain.native.symbol.clone(),
                decimals: self.chain.native.decimals,
            },
            explorer_urls: self.chain.explorer_urls.clone(),
        }
    }

    /// Compares `eth_chainId` with the configured chain. An unreachable RPC
    /// only logs a warning.
    pub async fn verify_chain(&self) -> Result<(), FetchError> {
        self.stats.inc_rpc_calls(1);
        match self.rpc.chain_id().await {
            Ok(actual) if actual == self.chain.chain_id => {
                tracing::info!("connected to {} (chain {})", self.chain.chain_name, actual);
                Ok(())
            }
            Ok(actual) => Err(FetchError::WrongChain {
                expected: self.chain.chain_id,
                actual,
            }),
            Err(err) => {
                self.stats.inc_rpc_errors();
                tracing::warn!("chain id check skipped: {}", err);
                Ok(())
            }
        }
    }

    pub(crate) async fn latest_block_number(&self) -> Option<u64> {
        self.stats.inc_rpc_calls(1);
        match self.rpc.block_number().await {
            Ok(n) => Some(n),
            Err(err) => {
                self.stats.inc_rpc_errors();
                tracing::warn!("latest block number unavailable: {}", err);
                None
            }
        }
    }

    pub(crate) async fn block_with_txs(&self, number: u64) -> Option<RpcBlock> {
        self.stats.inc_rpc_calls(1);
        match self.rpc.block_with_txs(number).await {
            Ok(block) => block,
            Err(err) => {
                self.stats.inc_rpc_errors();
                tracing::debug!("block {} unavailable: {}", number, err);
                None
            }
        }
    }

    pub(crate) async fn block_header(&self, number: u64) -> Option<RpcBlock> {
        self.stats.inc_rpc_calls(1);
        match self.rpc.block_header(number).await {
            Ok(block) => block,
            Err(err) => {
                self.stats.inc_rpc_errors();
                tracing::debug!("block header {} unavailable: {}", number, err);
                None
            }
        }
    }
}

/// Trims and checks a transaction hash: `0x` prefix, hex digits, 10 to 66
/// characters in total.
pub fn validate_tx_hash(raw: &str) -> Result<String, FetchError> {
    let hash = raw.trim();
    let valid = hash.len() >= 10
        && hash.len() <= 66
        && hash
            .strip_prefix("0x")
            .map_or(false, |digits| digits.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(hash.to_string())
    } else {
        Err(FetchError::InvalidHash(raw.to_string()))
    }
}

/// `0x` followed by exactly 40 hex digits.
pub fn validate_address(raw: &str) -> Result<String, FetchError> {
    let address = raw.trim();
    let valid = address.len() == 42
        && address
            .strip_prefix("0x")
            .map_or(false, |digits| digits.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(address.to_string())
    } else {
        Err(FetchError::InvalidAddress(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_validation_bounds() {
        assert!(validate_tx_hash("0x12345678").is_ok());
        assert!(validate_tx_hash(&format!("0x{}", "a".repeat(64))).is_ok());
        assert_eq!(
            validate_tx_hash("  0xABCDEF0123  ").unwrap(),
            "0xABCDEF0123"
        );

        assert!(validate_tx_hash("0x1234567").is_err());
        assert!(validate_tx_hash(&format!("0x{}", "a".repeat(65))).is_err());
        assert!(validate_tx_hash("1234567890ab").is_err());
        assert!(validate_tx_hash("0xzz34567890").is_err());
    }

    #[test]
    fn address_validation() {
        assert!(validate_address("0x89B50855Aa3bE2F677cD6303Cec089B5F319D72a").is_ok());
        assert!(matches!(
            validate_address("0x89B50855"),
            Err(FetchError::InvalidAddress(_))
        ));
        assert!(validate_address("89B50855Aa3bE2F677cD6303Cec089B5F319D72a00").is_err());
        assert!(validate_address("0xg9B50855Aa3bE2F677cD6303Cec089B5F319D72a").is_err());
    }
}
