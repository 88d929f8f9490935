use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "arc-scout", version, about = "ARC Testnet explorer backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server with background pollers
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check the RPC chain id and print the network description
    Network,
    /// Print a network stats snapshot
    Stats,
    /// Print the most recent blocks
    Blocks {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the most recent transactions
    Transactions {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the full record of one transaction
    Tx { hash: String },
    /// Print native and EURC balances of an address
    Wallet { address: String },
    /// Print the explorer transaction history of an address
    WalletTxs { address: String },
    /// List verified DApps, optionally of one category (NFT, DEX, Bridge, ...)
    Dapps {
        #[arg(long)]
        category: Option<String>,
    },
    /// Print daily transaction counts
    History,
    /// Print gas utilization of the latest block
    Utilization,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["arc-scout", "blocks", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::Blocks { limit: 5 }));

        let cli = Cli::try_parse_from(["arc-scout", "wallet-txs", "0xabc"]).unwrap();
        assert!(matches!(cli.command, Commands::WalletTxs { ref address } if address == "0xabc"));

        let cli = Cli::try_parse_from(["arc-scout", "network"]).unwrap();
        assert!(matches!(cli.command, Commands::Network));

        let cli = Cli::try_parse_from(["arc-scout", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { addr: None }));
    }
}
