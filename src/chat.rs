//! Assistant endpoint backend: proxies to an OpenAI-compatible
//! chat-completions API, or answers from a few canned replies when no key is
//! configured.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ChatConfig;

const SYSTEM_PROMPT: &str = "You are an assistant specialised in financial markets, \
cryptocurrencies, DeFi, blockchain and the ARC Testnet. Be conversational, helpful and \
detailed. When relevant, mention ARC Testnet DApps such as ArcFlow, Curve, Synthra and \
Superbridge, and encourage follow-up questions.";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1000;
const EMPTY_COMPLETION: &str = "Sorry, I could not generate a reply.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ChatError {
    #[error("chat completion API answered with status {status}")]
    Upstream { status: u16, details: Value },
    #[error("chat completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct ChatService {
    config: ChatConfig,
    http: reqwest::Client,
}

impl ChatService {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub async fn reply(&self, messages: &[ChatMessage]) -> Result<ChatReply, ChatError> {
        let key = match &self.config.api_key {
            Some(key) => key,
            None => {
                tracing::debug!("no chat API key configured, using canned reply");
                return Ok(ChatReply {
                    message: canned_reply(messages).to_string(),
                });
            }
        };

        let mut outgoing = Vec::with_capacity(messages.len() + 1);
        outgoing.push(json!({"role": "system", "content": SYSTEM_PROMPT}));
        outgoing.extend(
            messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content})),
        );
        let body = json!({
            "model": self.config.model,
            "messages": outgoing,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.json::<Value>().await.unwrap_or_else(|_| json!({}));
            tracing::error!("chat completion failed with {}: {}", status, details);
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                details,
            });
        }

        let data: Value = response.json().await?;
        let message = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(EMPTY_COMPLETION)
            .to_string();
        Ok(ChatReply { message })
    }
}

/// Keyword-matched answer to the last user message.
pub fn canned_reply(messages: &[ChatMessage]) -> &'static str {
    let last = messages
        .last()
        .map(|m| m.content.to_lowercase())
        .unwrap_or_default();
    let mentions = |words: &[&str]| words.iter().any(|w| last.contains(w));

    if mentions(&["market", "finance", "invest"]) {
        "Markets reward diversification, fundamental analysis and careful risk management. \
         On ARC Testnet you can try strategies without real funds. \
         Set OPENAI_API_KEY for more detailed answers."
    } else if mentions(&["crypto", "bitcoin", "ethereum", "usdc"]) {
        "Bitcoin is a store of value, Ethereum runs smart contracts and stablecoins like USDC \
         track the dollar. On ARC Testnet USDC is the native gas token. \
         Set OPENAI_API_KEY for more detailed answers."
    } else if mentions(&["defi", "swap", "liquidity", "pool"]) {
        "DEXs swap tokens without intermediaries and liquidity pools earn fees for providers. \
         Try Curve, Synthra or Defionarc on ARC Testnet. \
         Set OPENAI_API_KEY for more detailed answers."
    } else if mentions(&["arc", "testnet", "dapp"]) {
        "ARC Testnet has verified DApps for swapping, bridging, NFTs and domains, plus faucets \
         for test USDC and EURC. See /api/dapps for the full list."
    } else if mentions(&["help", "how"]) {
        "I can talk about markets, cryptocurrencies, DeFi, blockchain and ARC Testnet. \
         For smarter answers create an API key at https://platform.openai.com/api-keys \
         and set OPENAI_API_KEY before starting the server."
    } else {
        "Interesting! Ask me about markets, cryptocurrencies, DeFi or ARC Testnet DApps, \
         for example \"What is a DEX?\" or \"How do I use ARC Testnet?\"."
    }
}
