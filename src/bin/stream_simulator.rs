//! Stream simulator CLI
//!
//! Replays a seed census CSV dataset as a live file-drop stream: every
//! interval, a random batch of rows is sampled, occasional work-hours
//! anomalies are injected, and the batch is written as one headerless CSV
//! file into the stream directory where the engine picks it up.
//!
//! Usage:
//!   cargo run --bin stream_simulator -- --dataset ./census.csv --stream-dir ./stream_data

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::prelude::*;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use censusflow::models::Record;
use censusflow::source::csv_dir::parse_record;

/// Outlier hours injected into the stream so the anomaly detector has
/// something to find.
const ANOMALY_HOURS: [i64; 6] = [90, 95, 100, 5, 3, 1];

#[derive(Parser, Debug)]
#[command(name = "stream_simulator")]
#[command(about = "Replay a census CSV dataset as a simulated batch stream")]
struct Args {
    /// Seed dataset (headerless CSV, 14 columns)
    #[arg(long, env = "DATASET_PATH")]
    dataset: String,

    /// Directory the engine watches for batch files
    #[arg(long, env = "STREAM_DIR", default_value = "./stream_data")]
    stream_dir: String,

    /// Seconds between batches
    #[arg(long, default_value = "10")]
    interval: u64,

    /// Stop after roughly this many records
    #[arg(long, default_value = "500")]
    total: usize,

    /// Smallest batch size
    #[arg(long, default_value = "3")]
    min_batch: usize,

    /// Largest batch size
    #[arg(long, default_value = "10")]
    max_batch: usize,

    /// Per-record probability of an injected work-hours anomaly
    #[arg(long, default_value = "0.05")]
    anomaly_rate: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.min_batch == 0 || args.min_batch > args.max_batch {
        bail!(
            "invalid batch size range {}..={}",
            args.min_batch,
            args.max_batch
        );
    }

    let dataset = load_dataset(&args.dataset)?;
    info!(records = dataset.len(), "📂 Seed dataset loaded");
    if dataset.len() < args.min_batch {
        bail!(
            "seed dataset has {} records, fewer than the minimum batch size {}",
            dataset.len(),
            args.min_batch
        );
    }

    std::fs::create_dir_all(&args.stream_dir)
        .with_context(|| format!("Failed to create stream directory {}", args.stream_dir))?;
    clean_old_batches(&args.stream_dir)?;

    info!(
        stream_dir = %args.stream_dir,
        interval = args.interval,
        total = args.total,
        "🚀 Starting data stream simulation"
    );

    let mut rng = rand::thread_rng();
    let mut count = 0usize;
    let mut file_index = 0usize;

    while count < args.total {
        let batch = build_batch(
            &dataset,
            &mut rng,
            args.min_batch,
            args.max_batch,
            args.anomaly_rate,
        );

        let timestamp = chrono::Utc::now().timestamp();
        let file_name = format!("batch_{timestamp}_{file_index}.csv");
        let path = Path::new(&args.stream_dir).join(&file_name);

        let contents: String = batch.iter().map(|r| record_to_line(r) + "\n").collect();
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write batch file {}", path.display()))?;

        count += batch.len();
        file_index += 1;
        info!(file = %file_name, records = batch.len(), total = count, "📤 Batch written");

        std::thread::sleep(Duration::from_secs(args.interval));
    }

    info!(total = count, "✅ Stream simulation complete");
    Ok(())
}

/// Draw one batch: a random size within `min_batch..=max_batch`, records
/// sampled without replacement, and per-record injected work-hours outliers.
/// Callers must ensure the dataset holds at least `min_batch` records; a
/// dataset smaller than the drawn size caps the batch at the dataset size.
fn build_batch(
    dataset: &[Record],
    rng: &mut impl Rng,
    min_batch: usize,
    max_batch: usize,
    anomaly_rate: f64,
) -> Vec<Record> {
    let batch_size = rng.gen_range(min_batch..=max_batch).min(dataset.len());
    let mut batch: Vec<Record> = dataset
        .choose_multiple(rng, batch_size)
        .cloned()
        .collect();
    for record in &mut batch {
        if rng.gen_bool(anomaly_rate) {
            record.hours_per_week = *ANOMALY_HOURS.choose(rng).unwrap();
        }
    }
    batch
}

fn load_dataset(path: &str) -> Result<Vec<Record>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed dataset {path}"))?;

    let mut records = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line) {
            Ok(record) => records.push(record),
            Err(reason) => warn!(%reason, "Skipping malformed seed line"),
        }
    }

    if records.is_empty() {
        bail!("seed dataset {path} contains no parseable records");
    }
    Ok(records)
}

fn clean_old_batches(stream_dir: &str) -> Result<()> {
    for entry in std::fs::read_dir(stream_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale batch {}", path.display()))?;
        }
    }
    Ok(())
}

/// Serialize a record back to the wire column order.
fn record_to_line(r: &Record) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        r.age,
        r.workclass,
        r.education,
        r.marital_status,
        r.occupation,
        r.relationship,
        r.race,
        r.gender,
        r.capital_gain,
        r.capital_loss,
        r.hours_per_week,
        r.native_country,
        r.income,
        r.capital_income,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "39,State-gov,Bachelors,Never-married,Adm-clerical,Not-in-family,White,Male,2174,0,40,United-States,0,2174";

    #[test]
    fn record_line_round_trips() {
        let record = parse_record(LINE).unwrap();
        assert_eq!(record_to_line(&record), LINE);
    }

    #[test]
    fn anomaly_values_are_extreme_hours() {
        for hours in ANOMALY_HOURS {
            assert!(!(20..=60).contains(&hours));
        }
    }

    #[test]
    fn batch_sizes_stay_within_bounds() {
        let dataset = vec![parse_record(LINE).unwrap(); 50];
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let batch = build_batch(&dataset, &mut rng, 3, 10, 0.05);
            assert!(
                (3..=10).contains(&batch.len()),
                "batch size {} outside 3..=10",
                batch.len()
            );
        }
    }

    #[test]
    fn small_dataset_caps_the_batch_at_its_size() {
        let dataset = vec![parse_record(LINE).unwrap(); 4];
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let batch = build_batch(&dataset, &mut rng, 3, 10, 0.0);
            assert!((3..=4).contains(&batch.len()));
        }
    }

    #[test]
    fn full_anomaly_rate_rewrites_every_record() {
        let dataset = vec![parse_record(LINE).unwrap(); 20];
        let mut rng = rand::thread_rng();

        let batch = build_batch(&dataset, &mut rng, 5, 5, 1.0);
        assert_eq!(batch.len(), 5);
        assert!(batch
            .iter()
            .all(|r| ANOMALY_HOURS.contains(&r.hours_per_week)));
    }
}
