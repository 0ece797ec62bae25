//! File-drop batch source.
//!
//! Watches a directory for CSV batch files (headerless, fixed 14-column
//! schema, one file per batch) and serves them in filename order. Consumed
//! filenames are tracked in memory only; durable offset tracking belongs to
//! whatever resumes the stream after a restart.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::BatchSource;
use crate::models::{Batch, Record};

pub struct CsvDirSource {
    dir: PathBuf,
    consumed: HashSet<String>,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            consumed: HashSet::new(),
        }
    }

    /// Unconsumed CSV files, sorted by name. Batch files carry a timestamp
    /// prefix in their name, so name order is arrival order.
    fn pending_files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read stream directory {}", self.dir.display()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .filter(|p| {
                file_name(p)
                    .map(|name| !self.consumed.contains(&name))
                    .unwrap_or(false)
            })
            .collect();

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl BatchSource for CsvDirSource {
    async fn next_batch(&mut self) -> Result<Option<Batch>> {
        for path in self.pending_files()? {
            let name = file_name(&path).context("batch file has no name")?;
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(error) => {
                    // Same policy as malformed lines: an unreadable file must
                    // not block every file behind it.
                    warn!(file = %name, %error, "🛑 skipping unreadable batch file");
                    self.consumed.insert(name);
                    continue;
                }
            };

            let mut records = Vec::new();
            let mut skipped = 0usize;

            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_record(line) {
                    Ok(record) => records.push(record),
                    Err(reason) => {
                        warn!(file = %name, %reason, "🛑 dropping malformed CSV line");
                        skipped += 1;
                    }
                }
            }

            self.consumed.insert(name.clone());
            debug!(
                file = %name,
                records = records.len(),
                skipped,
                "Batch file consumed"
            );

            return Ok(Some(Batch::new(records).with_skipped(skipped)));
        }

        Ok(None)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Parse one headerless CSV line in the wire column order:
/// age, workclass, education, marital_status, occupation, relationship,
/// race, gender, capital_gain, capital_loss, hours_per_week,
/// native_country, income, capital_income.
pub fn parse_record(line: &str) -> Result<Record, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 14 {
        return Err(format!("expected 14 fields, got {}", fields.len()));
    }

    let int = |index: usize, name: &str| -> Result<i64, String> {
        fields[index]
            .parse::<i64>()
            .map_err(|_| format!("invalid integer for {name}: {:?}", fields[index]))
    };

    Ok(Record {
        age: int(0, "age")?,
        workclass: fields[1].to_string(),
        education: fields[2].to_string(),
        marital_status: fields[3].to_string(),
        occupation: fields[4].to_string(),
        relationship: fields[5].to_string(),
        race: fields[6].to_string(),
        gender: fields[7].to_string(),
        capital_gain: int(8, "capital_gain")?,
        capital_loss: int(9, "capital_loss")?,
        hours_per_week: int(10, "hours_per_week")?,
        native_country: fields[11].to_string(),
        income: int(12, "income")?,
        capital_income: int(13, "capital_income")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GOOD_LINE: &str =
        "39,State-gov,Bachelors,Never-married,Adm-clerical,Not-in-family,White,Male,2174,0,40,United-States,0,2174";

    #[test]
    fn parses_well_formed_line() {
        let record = parse_record(GOOD_LINE).unwrap();
        assert_eq!(record.age, 39);
        assert_eq!(record.workclass, "State-gov");
        assert_eq!(record.occupation, "Adm-clerical");
        assert_eq!(record.hours_per_week, 40);
        assert_eq!(record.income, 0);
        assert_eq!(record.capital_income, 2174);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse_record("39,State-gov,Bachelors").is_err());
    }

    #[test]
    fn rejects_non_numeric_age() {
        let line = GOOD_LINE.replacen("39", "thirty-nine", 1);
        assert!(parse_record(&line).is_err());
    }

    #[tokio::test]
    async fn consumes_files_in_name_order_exactly_once() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join("batch_1700000020_1.csv"), GOOD_LINE).unwrap();
        fs::write(
            dir.path().join("batch_1700000010_0.csv"),
            format!("{GOOD_LINE}\n{GOOD_LINE}"),
        )
        .unwrap();

        let mut source = CsvDirSource::new(dir.path());

        let first = source.next_batch().await.unwrap().unwrap();
        assert_eq!(first.records.len(), 2);

        let second = source.next_batch().await.unwrap().unwrap();
        assert_eq!(second.records.len(), 1);

        assert!(source.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_lines_are_counted_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("batch_1.csv"),
            format!("{GOOD_LINE}\nnot,a,valid,line\n\n{GOOD_LINE}"),
        )
        .unwrap();

        let mut source = CsvDirSource::new(dir.path());
        let batch = source.next_batch().await.unwrap().unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);
    }

    #[tokio::test]
    async fn ignores_non_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let mut source = CsvDirSource::new(dir.path());
        assert!(source.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_and_does_not_block_the_stream() {
        let dir = tempfile::tempdir().unwrap();

        // A directory with a .csv name is picked up but can never be read.
        fs::create_dir(dir.path().join("batch_1700000010_0.csv")).unwrap();
        fs::write(dir.path().join("batch_1700000020_1.csv"), GOOD_LINE).unwrap();

        let mut source = CsvDirSource::new(dir.path());

        let batch = source.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.records.len(), 1);

        // The unreadable entry is consumed and never served again.
        assert!(source.next_batch().await.unwrap().is_none());
        assert!(source.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn picks_up_files_dropped_later() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = CsvDirSource::new(dir.path());

        assert!(source.next_batch().await.unwrap().is_none());

        fs::write(dir.path().join("batch_2.csv"), GOOD_LINE).unwrap();
        let batch = source.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.records.len(), 1);
    }
}
