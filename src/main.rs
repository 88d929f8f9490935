mod cli;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use arc_scout::api::{self, AppState};
use arc_scout::chat::ChatService;
use arc_scout::config::Config;
use arc_scout::dapps::catalog;
use arc_scout::fetch::{blocks, details, history, stats, transactions, utilization, wallet};
use arc_scout::fetch::FetchContext;
use arc_scout::models::DAppCategory;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            let ctx = fetch_context(&config)?;
            ctx.verify_chain()
                .await
                .context("RPC endpoint does not match the configured chain")?;
            let chat = ChatService::new(config.chat.clone()).context("failed to build chat client")?;
            api::run_http_server(AppState::new(ctx, chat), &bind).await?;
        }
        Commands::Network => {
            let ctx = fetch_context(&config)?;
            ctx.verify_chain().await?;
            print_json(&ctx.chain_info())?;
        }
        Commands::Stats => {
            let ctx = fetch_context(&config)?;
            print_json(&stats::fetch_network_stats(&ctx).await)?;
        }
        Commands::Blocks { limit } => {
            config.tuning.recent_blocks_limit = limit;
            let ctx = fetch_context(&config)?;
            print_json(&blocks::fetch_recent_blocks(&ctx).await)?;
        }
        Commands::Transactions { limit } => {
            config.tuning.recent_tx_limit = limit;
            let ctx = fetch_context(&config)?;
            print_json(&transactions::fetch_recent_transactions(&ctx).await)?;
        }
        Commands::Tx { hash } => {
            let ctx = fetch_context(&config)?;
            let detail = details::fetch_transaction_detail(&ctx, &hash)
                .await
                .context("transaction lookup failed")?
                .with_context(|| format!("transaction {} not found", hash))?;
            print_json(&detail)?;
        }
        Commands::Wallet { address } => {
            let ctx = fetch_context(&config)?;
            let balances = wallet::fetch_wallet_balances(&ctx, &address)
                .await
                .context("balance lookup failed")?;
            print_json(&balances)?;
        }
        Commands::WalletTxs { address } => {
            let ctx = fetch_context(&config)?;
            let txs = wallet::fetch_wallet_transactions(&ctx, &address)
                .await
                .context("wallet history lookup failed")?;
            print_json(&txs)?;
        }
        Commands::Dapps { category } => {
            let category = category
                .as_deref()
                .map(str::parse::<DAppCategory>)
                .transpose()?;
            print_json(&catalog(category))?;
        }
        Commands::History => {
            let ctx = fetch_context(&config)?;
            print_json(&history::fetch_transaction_history(&ctx).await)?;
        }
        Commands::Utilization => {
            let ctx = fetch_context(&config)?;
            let usage = utilization::fetch_network_utilization(&ctx)
                .await
                .context("latest block unavailable")?;
            print_json(&usage)?;
        }
    }

    Ok(())
}

fn fetch_context(config: &Config) -> anyhow::Result<FetchContext> {
    FetchContext::from_config(config).context("failed to build RPC and explorer clients")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
