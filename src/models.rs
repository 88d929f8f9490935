use serde::{Deserialize, Serialize};

/// Static description of the explored network.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrencyInfo,
    pub explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeCurrencyInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub current_block: u64,
    pub total_transactions: u64,
    pub active_wallets: u64,
    #[serde(rename = "networkTPS")]
    pub network_tps: f64,
    pub total_blocks: u64,
    pub daily_transactions: u64,
    pub total_addresses: u64,
    pub dapps_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub number: u64,
    pub hash: String,
    pub timestamp: i64,
    pub transaction_count: u64,
    pub gas_used: String,
    pub gas_limit: String,
    pub miner: String,
    pub formatted_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub timestamp: i64,
    pub block_number: u64,
    pub status: TxStatus,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub formatted_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenTransfer {
    pub from: String,
    pub to: String,
    pub token: TokenInfo,
    pub value: String,
    #[serde(rename = "type")]
    pub transfer_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInput {
    pub method_call: String,
    pub method_id: String,
    pub parameters: Vec<DecodedParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub timestamp: i64,
    pub block_number: u64,
    pub status: TxStatus,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub formatted_time: String,
    pub gas_used: String,
    /// Gas price in gwei.
    pub gas_price: String,
    /// Gas price in wei, as reported upstream.
    pub gas_price_raw: String,
    pub gas_limit: String,
    pub nonce: u64,
    pub transaction_index: u64,
    pub block_hash: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_input: Option<DecodedInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub token_transfers: Vec<TokenTransfer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_contract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transaction_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    pub balance: String,
    pub decimals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DAppCategory {
    #[serde(rename = "NFT")]
    Nft,
    #[serde(rename = "DEX")]
    Dex,
    Bridge,
    Domain,
    Deploy,
    Wallet,
    Faucet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DAppListing {
    pub name: &'static str,
    pub category: DAppCategory,
    pub description: &'static str,
    pub url: &'static str,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTransactions {
    pub date: String,
    pub transactions: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkUtilization {
    /// Percentage of the gas limit used by the latest block, two decimals.
    pub utilization: f64,
    pub gas_used: String,
    pub gas_limit: String,
    pub current_block: u64,
}
