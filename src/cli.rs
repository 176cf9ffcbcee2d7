/// CLI Module
///
/// Command-line interface configuration using clap.
use clap::Parser;

/// Order Book Event Ingester
///
/// Incrementally synchronize on-chain order book events into PostgreSQL,
/// resuming from the per-book checkpoint committed by the previous run.
#[derive(Parser, Debug)]
#[command(name = "book-event-ingester")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Network identifier to ingest ("1" mainnet, "3" ropsten, "4" rinkeby)
    #[arg(short = 'n', long, value_name = "ID", default_value = "1")]
    pub network_id: String,

    /// Path to the book registry JSON file
    #[arg(long, value_name = "PATH", default_value = "books.json")]
    pub books: String,

    /// JSON-RPC endpoint URL (overrides ETH_RPC_URL env var)
    #[arg(short = 'r', long, value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Database connection URL (overrides DATABASE_URL env var)
    #[arg(short = 'd', long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Blocks held back from the chain head to ride out reorgs
    #[arg(long, value_name = "BLOCKS", default_value = "16")]
    pub confirmation_depth: u64,

    /// In-flight connector calls per enrichment sub-step
    #[arg(long, value_name = "COUNT", default_value = "3")]
    pub enrich_concurrency: usize,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network_id.is_empty() {
            anyhow::bail!("Network id must not be empty");
        }

        if self.enrich_concurrency == 0 {
            anyhow::bail!("Enrichment concurrency must be greater than 0");
        }

        Ok(())
    }
}
