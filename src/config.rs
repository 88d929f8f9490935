use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://rpc.testnet.arc.network";
pub const DEFAULT_EXPLORER_URLS: &str = "https://testnet.arcscan.app,https://api.testnet.arcscan.app";
pub const DEFAULT_CHAIN_ID: u64 = 5_042_002;
pub const NATIVE_PRECOMPILE_ADDRESS: &str = "0x3600000000000000000000000000000000000000";
pub const DEFAULT_SECONDARY_TOKEN_ADDRESS: &str = "0x89B50855Aa3bE2F677cD6303Cec089B5F319D72a";
pub const PLACEHOLDER_OPENAI_KEY: &str = "sk-your-api-key-here";

#[derive(Debug, Clone)]
pub struct Config {
    pub chain: ChainConfig,
    pub tuning: Tuning,
    pub http_bind_addr: String,
    pub chat: ChatConfig,
}

/// Static description of the one network this service explores.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub explorer_urls: Vec<String>,
    pub native: NativeCurrency,
    pub secondary_token: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    /// Contract address under which explorers list the native balance.
    pub precompile_address: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u32,
}

/// Sampling sizes, timeouts and numeric correction thresholds.
///
/// The rescale and daily-reference values are tuned to one deployment's data
/// and are kept here so they can be changed without touching fetch logic.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub rpc_timeout: Duration,
    pub rpc_retries: u32,
    pub rpc_retry_delay: Duration,
    pub receipt_timeout: Duration,
    pub stats_rest_timeout: Duration,
    pub listing_rest_timeout: Duration,
    pub detail_rest_timeout: Duration,
    pub tps_sample_blocks: u64,
    pub assumed_block_time_secs: f64,
    pub fallback_avg_tx_per_block: f64,
    pub blocks_per_day: u64,
    pub daily_scan_blocks: u64,
    pub daily_tx_reference: Option<u64>,
    pub daily_tx_tolerance: f64,
    pub address_scan_window: u64,
    pub address_sample_blocks: u64,
    pub active_scan_window: u64,
    pub active_sample_blocks: u64,
    pub dapps_fallback_count: u64,
    pub recent_blocks_limit: usize,
    pub recent_tx_limit: usize,
    pub recent_tx_scan_ceiling: u64,
    pub history_days: usize,
    pub history_blocks_per_day_sample: u64,
    pub history_default_daily_tx: u64,
    pub value_rescale_threshold: f64,
    pub value_rescale_exponent: u32,
    pub scan_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
    #[error("invalid value {value:?} for {var}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("invalid URL {value:?} in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(30),
            rpc_retries: 3,
            rpc_retry_delay: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(2),
            stats_rest_timeout: Duration::from_secs(3),
            listing_rest_timeout: Duration::from_secs(10),
            detail_rest_timeout: Duration::from_secs(15),
            tps_sample_blocks: 20,
            assumed_block_time_secs: 1.5,
            fallback_avg_tx_per_block: 50.0,
            blocks_per_day: 57_600,
            daily_scan_blocks: 2_000,
            daily_tx_reference: Some(1_210_000),
            daily_tx_tolerance: 0.10,
            address_scan_window: 30,
            address_sample_blocks: 20,
            active_scan_window: 1_000,
            active_sample_blocks: 500,
            dapps_fallback_count: 14,
            recent_blocks_limit: 10,
            recent_tx_limit: 20,
            recent_tx_scan_ceiling: 2_000,
            history_days: 30,
            history_blocks_per_day_sample: 10,
            history_default_daily_tx: 50_000,
            value_rescale_threshold: 1_000.0,
            value_rescale_exponent: 12,
            scan_concurrency: 8,
        }
    }
}

impl ChainConfig {
    pub fn arc_testnet() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            chain_name: "ARC Testnet".to_string(),
            rpc_urls: vec![DEFAULT_RPC_URL.to_string()],
            explorer_urls: parse_list(DEFAULT_EXPLORER_URLS),
            native: NativeCurrency {
                name: "USDC".to_string(),
                symbol: "USDC".to_string(),
                decimals: 6,
                precompile_address: NATIVE_PRECOMPILE_ADDRESS.to_string(),
            },
            secondary_token: TokenConfig {
                symbol: "EURC".to_string(),
                address: DEFAULT_SECONDARY_TOKEN_ADDRESS.to_string(),
                decimals: 6,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut chain = ChainConfig::arc_testnet();

        let rpc_url = env::var("ARC_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        let mut rpc_urls = vec![rpc_url];
        if let Ok(raw) = env::var("ARC_FALLBACK_RPC_URLS") {
            rpc_urls.extend(parse_list(&raw));
        }
        validate_urls("ARC_RPC_URL", &rpc_urls)?;
        chain.rpc_urls = rpc_urls;

        if let Ok(raw) = env::var("ARC_EXPLORER_URLS") {
            let urls = parse_list(&raw);
            if urls.is_empty() {
                return Err(ConfigError::Empty {
                    var: "ARC_EXPLORER_URLS",
                });
            }
            chain.explorer_urls = urls;
        }
        validate_urls("ARC_EXPLORER_URLS", &chain.explorer_urls)?;

        chain.chain_id = parse_var("ARC_CHAIN_ID", chain.chain_id)?;
        if let Ok(name) = env::var("ARC_CHAIN_NAME") {
            if name.trim().is_empty() {
                return Err(ConfigError::Empty {
                    var: "ARC_CHAIN_NAME",
                });
            }
            chain.chain_name = name.trim().to_string();
        }
        chain.native.decimals = parse_var("ARC_NATIVE_DECIMALS", chain.native.decimals)?;
        if let Ok(addr) = env::var("ARC_SECONDARY_TOKEN_ADDRESS") {
            chain.secondary_token.address = addr.trim().to_string();
        }

        let mut tuning = Tuning::default();
        tuning.rpc_retries = parse_var("ARC_RPC_RETRIES", tuning.rpc_retries)?;
        tuning.value_rescale_threshold =
            parse_var("ARC_VALUE_RESCALE_THRESHOLD", tuning.value_rescale_threshold)?;
        tuning.value_rescale_exponent =
            parse_var("ARC_VALUE_RESCALE_EXPONENT", tuning.value_rescale_exponent)?;
        tuning.daily_tx_tolerance = parse_var("ARC_DAILY_TX_TOLERANCE", tuning.daily_tx_tolerance)?;
        tuning.daily_scan_blocks = parse_var("ARC_DAILY_SCAN_BLOCKS", tuning.daily_scan_blocks)?;
        tuning.recent_tx_scan_ceiling =
            parse_var("ARC_RECENT_TX_SCAN_CEILING", tuning.recent_tx_scan_ceiling)?;
        tuning.daily_tx_reference = match env::var("ARC_DAILY_TX_REFERENCE") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Ok(raw) => Some(parse_value("ARC_DAILY_TX_REFERENCE", &raw)?),
            Err(_) => tuning.daily_tx_reference,
        };

        let http_bind_addr = env::var("HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let chat = ChatConfig {
            api_key: env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty() && k != PLACEHOLDER_OPENAI_KEY),
            api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout: Duration::from_secs(30),
        };

        Ok(Self {
            chain,
            tuning,
            http_bind_addr,
            chat,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_urls(var: &'static str, urls: &[String]) -> Result<(), ConfigError> {
    for value in urls {
        url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
            var,
            value: value.clone(),
            source,
        })?;
    }
    Ok(())
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => parse_value(var, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}
