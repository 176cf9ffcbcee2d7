/// Order Book Event Ingester
///
/// Checkpointed ETL pipeline synchronizing on-chain order book events into
/// PostgreSQL. Each run resumes from the per-book checkpoint committed by
/// the previous run and advances it with a compare-and-swap update.
mod cli;
mod db;
mod errors;
mod etl;
mod models;
mod pipeline;
mod rpc;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use crate::cli::Cli;
use crate::db::Database;
use crate::errors::IngestError;
use crate::models::BookInfo;
use crate::pipeline::{Ingester, IngesterConfig};
use crate::rpc::EthRpcClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Cli::parse();
    args.validate()?;

    let network = network_name(&args.network_id).ok_or_else(|| IngestError::Config(args.network_id.clone()))?;

    println!("🚀 Starting order book event ingester on {}...", network);

    // Get RPC endpoint from CLI or environment; never embedded in code
    let rpc_url = match args.rpc_url.clone() {
        Some(url) => url,
        None => env::var("ETH_RPC_URL").context("ETH_RPC_URL not found in environment. Please check your .env file")?,
    };

    let rpc_client = EthRpcClient::new(rpc_url).context("Failed to create RPC client")?;
    rpc_client.test_connection().await.context("Failed to connect to RPC endpoint")?;
    println!("✅ RPC endpoint reachable");

    // Initialize database connection
    let database_url = match args.database_url.clone() {
        Some(url) => url,
        None => env::var("DATABASE_URL").context("DATABASE_URL not found in environment. Please check your .env file")?,
    };

    println!("💾 Connecting to PostgreSQL database...");
    let database = Database::new(&database_url).await.context("Failed to connect to PostgreSQL database")?;
    database.test_connection().await.context("Database connection test failed")?;

    println!("📋 Running database migrations...");
    database.migrate().await.context("Failed to run database migrations")?;

    // The book list is externally supplied configuration; checkpoint rows
    // for each book are pre-seeded in the database.
    let books = load_books(&args.books).context("Failed to load book registry")?;
    println!("📚 Loaded {} books from {}", books.len(), args.books);

    tracing::info!("ingester initialized for network {} ({})", args.network_id, network);

    let config = IngesterConfig {
        network_id: args.network_id.clone(),
        confirmation_depth: args.confirmation_depth,
        enrich_concurrency: args.enrich_concurrency,
    };

    let ingester = Ingester::new(rpc_client, database, config);
    let stats = ingester.run(&books).await.context("Ingestion run failed")?;

    ingester.print_summary(&stats);
    println!("\n✨ Ingestion run complete!");

    Ok(())
}

/// Map a network id to its display name; unknown ids abort before any work.
fn network_name(network_id: &str) -> Option<&'static str> {
    match network_id {
        "1" => Some("mainnet"),
        "3" => Some("ropsten"),
        "4" => Some("rinkeby"),
        _ => None,
    }
}

/// Read the book registry from a JSON file.
fn load_books(path: &str) -> Result<Vec<BookInfo>> {
    let raw = std::fs::read_to_string(path).context(format!("Failed to read {}", path))?;
    let books: Vec<BookInfo> = serde_json::from_str(&raw).context(format!("Failed to parse {}", path))?;

    Ok(books)
}
