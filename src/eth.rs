use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{
    Block, BlockId, Bytes, Transaction, TransactionReceipt, TransactionRequest, H160, H256, U256,
};
use ethers_providers::{Http, Middleware, Provider, ProviderError, RpcError as _};
use url::Url;

/// `balanceOf(address)`
pub const SELECTOR_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// `decimals()`
pub const SELECTOR_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
/// `symbol()`
pub const SELECTOR_SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    #[error("{method} timed out after {after:?}")]
    Timeout { method: &'static str, after: Duration },
    #[error("{method} failed: {source}")]
    Provider {
        method: &'static str,
        #[source]
        source: ProviderError,
    },
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("invalid transaction hash {0:?}")]
    InvalidHash(String),
    #[error("failed to build RPC client for {url}: {reason}")]
    Setup { url: String, reason: String },
    #[error("no RPC endpoint configured")]
    NoEndpoint,
}

/// Block as returned by `eth_getBlockByNumber`. `transactions` is only
/// populated when full transaction objects were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcBlock {
    pub number: u64,
    pub hash: Option<String>,
    pub timestamp: i64,
    pub gas_used: U256,
    pub gas_limit: U256,
    pub miner: Option<String>,
    pub transaction_count: usize,
    pub transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub input: String,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: u64,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub transaction_index: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcReceipt {
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub transaction_index: u64,
    pub gas_used: Option<U256>,
    pub effective_gas_price: Option<U256>,
    /// `Some(true)` for status 1, `Some(false)` for status 0.
    pub success: Option<bool>,
    pub contract_address: Option<String>,
}

/// Read-only JSON-RPC surface the fetchers depend on.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;
    async fn block_number(&self) -> Result<u64, RpcError>;
    async fn block_with_txs(&self, number: u64) -> Result<Option<RpcBlock>, RpcError>;
    async fn block_header(&self, number: u64) -> Result<Option<RpcBlock>, RpcError>;
    async fn transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, RpcError>;
    async fn receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, RpcError>;
    async fn balance(&self, address: &str) -> Result<U256, RpcError>;
    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError>;
    async fn code(&self, address: &str) -> Result<Vec<u8>, RpcError>;
}

#[derive(Clone)]
pub struct EthClient {
    providers: Vec<Provider<Http>>,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
}

impl EthClient {
    /// Builds one provider per URL; calls go to the first URL and move on to
    /// the next once its retries are spent.
    pub fn new(rpc_urls: &[String], timeout: Duration) -> Result<Self, RpcError> {
        if rpc_urls.is_empty() {
            return Err(RpcError::NoEndpoint);
        }
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Setup {
                url: rpc_urls[0].clone(),
                reason: e.to_string(),
            })?;

        let providers = rpc_urls
            .iter()
            .map(|raw| {
                let url = Url::parse(raw).map_err(|e| RpcError::Setup {
                    url: raw.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Provider::new(Http::new_with_client(url, client.clone())))
            })
            .collect::<Result<Vec<_>, RpcError>>()?;

        Ok(Self {
            providers,
            timeout,
            retries: 0,
            retry_delay: Duration::ZERO,
        })
    }

    /// Extra attempts per URL after a timeout or transport failure. JSON-RPC
    /// error responses are never retried on the same URL.
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    async fn with_provider<T, F, Fut>(&self, method: &'static str, call: F) -> Result<T, RpcError>
    where
        F: Fn(Provider<Http>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_err = RpcError::NoEndpoint;
        for provider in &self.providers {
            for attempt in 0..=self.retries {
                if attempt > 0 {
                    tracing::debug!(
                        "{} retry {}/{} on {}",
                        method,
                        attempt,
                        self.retries,
                        provider.url()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                match tokio::time::timeout(self.timeout, call(provider.clone())).await {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(source)) => {
                        tracing::debug!("{} failed on {}: {}", method, provider.url(), source);
                        let answered = source.is_error_response();
                        last_err = RpcError::Provider { method, source };
                        if answered {
                            break;
                        }
                    }
                    Err(_) => {
                        tracing::debug!("{} timed out on {}", method, provider.url());
                        last_err = RpcError::Timeout {
                            method,
                            after: self.timeout,
                        };
                    }
                }
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl ChainRpc for EthClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let id = self
            .with_provider("eth_chainId", |p| async move { p.get_chainid().await })
            .await?;
        Ok(id.low_u64())
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let number = self
            .with_provider("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await?;
        Ok(number.as_u64())
    }

    async fn block_with_txs(&self, number: u64) -> Result<Option<RpcBlock>, RpcError> {
        let block = self
            .with_provider("eth_getBlockByNumber", |p| async move {
                p.get_block_with_txs(BlockId::Number(number.into())).await
            })
            .await?;
        Ok(block.and_then(normalize_block))
    }

    async fn block_header(&self, number: u64) -> Result<Option<RpcBlock>, RpcError> {
        let block = self
            .with_provider("eth_getBlockByNumber", |p| async move {
                p.get_block(BlockId::Number(number.into())).await
            })
            .await?;
        Ok(block.and_then(normalize_header))
    }

    async fn transaction(&self, hash: &str) -> Result<Option<RpcTransaction>, RpcError> {
        let hash = parse_hash(hash)?;
        let tx = self
            .with_provider("eth_getTransactionByHash", |p| async move {
                p.get_transaction(hash).await
            })
            .await?;
        Ok(tx.map(normalize_tx))
    }

    async fn receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, RpcError> {
        let hash = parse_hash(hash)?;
        let receipt = self
            .with_provider("eth_getTransactionReceipt", |p| async move {
                p.get_transaction_receipt(hash).await
            })
            .await?;
        Ok(receipt.map(normalize_receipt))
    }

    async fn balance(&self, address: &str) -> Result<U256, RpcError> {
        let address = parse_address(address)?;
        self.with_provider("eth_getBalance", |p| async move {
            p.get_balance(address, None).await
        })
        .await
    }

    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let to = parse_address(to)?;
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(Bytes::from(data)).into();
        let out = self
            .with_provider("eth_call", |p| {
                let tx = tx.clone();
                async move { p.call(&tx, None).await }
            })
            .await?;
        Ok(out.to_vec())
    }

    async fn code(&self, address: &str) -> Result<Vec<u8>, RpcError> {
        let address = parse_address(address)?;
        let code = self
            .with_provider("eth_getCode", |p| async move { p.get_code(address, None).await })
            .await?;
        Ok(code.to_vec())
    }
}

pub async fn erc20_balance_of(
    rpc: &dyn ChainRpc,
    token: &str,
    owner: &str,
) -> Result<U256, RpcError> {
    let owner = parse_address(owner)?;
    let mut data = SELECTOR_BALANCE_OF.to_vec();
    data.extend(abi::encode(&[Token::Address(owner)]));
    let out = rpc.call(token, data).await?;
    Ok(decode_uint(&out).unwrap_or_default())
}

pub async fn erc20_decimals(rpc: &dyn ChainRpc, token: &str) -> Result<Option<u32>, RpcError> {
    let out = rpc.call(token, SELECTOR_DECIMALS.to_vec()).await?;
    Ok(decode_uint(&out)
        .filter(|d| *d <= U256::from(u8::MAX))
        .map(|d| d.as_u32()))
}

pub async fn erc20_symbol(rpc: &dyn ChainRpc, token: &str) -> Result<Option<String>, RpcError> {
    let out = rpc.call(token, SELECTOR_SYMBOL.to_vec()).await?;
    Ok(decode_string(&out))
}

fn decode_uint(out: &[u8]) -> Option<U256> {
    if out.len() < 32 {
        return None;
    }
    Some(U256::from_big_endian(&out[..32]))
}

fn decode_string(out: &[u8]) -> Option<String> {
    match abi::decode(&[ParamType::String], out).ok()?.into_iter().next()? {
        Token::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

pub fn parse_address(raw: &str) -> Result<H160, RpcError> {
    raw.trim()
        .parse::<H160>()
        .map_err(|_| RpcError::InvalidAddress(raw.to_string()))
}

pub fn parse_hash(raw: &str) -> Result<H256, RpcError> {
    raw.trim()
        .parse::<H256>()
        .map_err(|_| RpcError::InvalidHash(raw.to_string()))
}

fn normalize_block(block: Block<Transaction>) -> Option<RpcBlock> {
    let number = block.number?.as_u64();
    let transactions: Vec<RpcTransaction> = block.transactions.into_iter().map(normalize_tx).collect();
    Some(RpcBlock {
        number,
        hash: block.hash.map(hash_to_lower_hex),
        timestamp: block.timestamp.low_u64() as i64,
        gas_used: block.gas_used,
        gas_limit: block.gas_limit,
        miner: block.author.map(address_to_lower_hex),
        transaction_count: transactions.len(),
        transactions,
    })
}

fn normalize_header(block: Block<H256>) -> Option<RpcBlock> {
    let number = block.number?.as_u64();
    Some(RpcBlock {
        number,
        hash: block.hash.map(hash_to_lower_hex),
        timestamp: block.timestamp.low_u64() as i64,
        gas_used: block.gas_used,
        gas_limit: block.gas_limit,
        miner: block.author.map(address_to_lower_hex),
        transaction_count: block.transactions.len(),
        transactions: Vec::new(),
    })
}

fn normalize_tx(tx: Transaction) -> RpcTransaction {
    RpcTransaction {
        hash: hash_to_lower_hex(tx.hash),
        from: address_to_lower_hex(tx.from),
        to: tx.to.map(address_to_lower_hex),
        value: tx.value,
        input: format!("0x{}", hex::encode(&tx.input)),
        gas: tx.gas,
        gas_price: tx.gas_price,
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        nonce: tx.nonce.low_u64(),
        block_number: tx.block_number.map(|n| n.as_u64()),
        block_hash: tx.block_hash.map(hash_to_lower_hex),
        transaction_index: tx.transaction_index.map(|i| i.as_u64()),
    }
}

fn normalize_receipt(receipt: TransactionReceipt) -> RpcReceipt {
    RpcReceipt {
        block_number: receipt.block_number.map(|n| n.as_u64()),
        block_hash: receipt.block_hash.map(hash_to_lower_hex),
        transaction_index: receipt.transaction_index.as_u64(),
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        success: receipt.status.map(|s| s.as_u64() == 1),
        contract_address: receipt.contract_address.map(address_to_lower_hex),
    }
}

fn address_to_lower_hex(addr: H160) -> String {
    format!("0x{:x}", addr)
}

fn hash_to_lower_hex(hash: H256) -> String {
    format!("0x{:x}", hash)
}
