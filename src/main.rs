//! CensusFlow - Real-Time Census Analytics Engine
//!
//! Ingests census record batches from a file-drop directory, enriches each
//! record with derived categorical features, computes per-batch summary
//! statistics and grouped aggregations, flags hours-per-week outliers, and
//! persists every result to the SQLite document store.

mod engine;
mod models;
mod sink;
mod source;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::{sync::Arc, time::Duration};
use tokio::{signal, time::interval};
use tracing::{debug, error, info, warn};

use crate::{
    engine::processor::{BatchDocuments, BatchOutcome, BatchProcessor},
    models::Config,
    sink::{DbDocumentStore, DocumentSink},
    source::{BatchSource, CsvDirSource},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("🚀 CensusFlow Analytics Engine Starting");

    let config = Config::from_env()?;
    info!(
        stream_dir = %config.stream_dir,
        database = %config.database_path,
        trigger_interval_secs = config.trigger_interval_secs,
        zscore_threshold = config.zscore_threshold,
        "Configuration loaded"
    );

    std::fs::create_dir_all(&config.stream_dir)
        .with_context(|| format!("Failed to create stream directory {}", config.stream_dir))?;

    let store = Arc::new(DbDocumentStore::new(&config.database_path)?);
    let mut source = CsvDirSource::new(&config.stream_dir);
    let processor = BatchProcessor::new(store, &config);

    let mut ticker = interval(Duration::from_secs(config.trigger_interval_secs.max(1)));

    // Computed-but-unpersisted documents from a failed cycle. Resubmitted
    // before any new batch so arrival order is preserved.
    let mut pending: Option<BatchDocuments> = None;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Stopping processing loop...");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(&mut source, &processor, &mut pending).await {
                    error!("Processing cycle error: {e:#}");
                }
            }
        }
    }

    if pending.is_some() {
        warn!("Shutting down with one unpersisted batch; it will be re-read on restart");
    }

    info!("👋 CensusFlow stopped");
    Ok(())
}

/// One trigger cycle: resubmit any pending batch, then drain all batches
/// currently available from the source, in arrival order, each fully
/// processed before the next.
async fn run_cycle<S, K>(
    source: &mut S,
    processor: &BatchProcessor<K>,
    pending: &mut Option<BatchDocuments>,
) -> Result<()>
where
    S: BatchSource,
    K: DocumentSink,
{
    if let Some(documents) = pending.take() {
        match processor.persist(&documents).await {
            Ok(persisted) => {
                info!(persisted, "♻️  Pending batch resubmitted");
            }
            Err(e) => {
                warn!("Sink still unavailable, keeping pending batch: {e:#}");
                *pending = Some(documents);
                // Don't consume new batches ahead of the stuck one.
                return Ok(());
            }
        }
    }

    while let Some(batch) = source.next_batch().await? {
        match processor.process(batch).await {
            Ok(BatchOutcome::Empty { skipped }) => {
                debug!(skipped, "No-op batch");
            }
            Ok(BatchOutcome::Processed { .. }) => {}
            Err(failure) => {
                error!("❌ {failure:#}");
                *pending = Some(failure.documents);
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
