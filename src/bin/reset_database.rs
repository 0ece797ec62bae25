//! Database reset CLI
//!
//! Clears all eight result collections so a stream can restart from
//! scratch. Idempotent; each collection either fully clears or is reported
//! as failed.
//!
//! Usage:
//!   cargo run --bin reset_database -- --db ./censusflow.db

use anyhow::Result;
use clap::Parser;

use censusflow::sink::{DbDocumentStore, DocumentSink};

#[derive(Parser, Debug)]
#[command(name = "reset_database")]
#[command(about = "Clear all CensusFlow result collections")]
struct Args {
    /// Path to the SQLite document store
    #[arg(long, env = "DATABASE_PATH", default_value = "./censusflow.db")]
    db: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    println!("Connecting to document store at {}...", args.db);
    let store = DbDocumentStore::new(&args.db)?;

    println!("Resetting collections...");
    let report = store.reset().await?;

    for name in &report.cleared {
        println!("✓ Cleared collection: {name}");
    }
    for (name, error) in &report.failed {
        println!("× Error clearing {name}: {error}");
    }

    if report.all_cleared() {
        println!("\nDatabase reset complete. You can now stream data from scratch.");
        Ok(())
    } else {
        anyhow::bail!("{} collection(s) failed to clear", report.failed.len());
    }
}
