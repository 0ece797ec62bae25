//! Batch processor.
//!
//! Sequences one batch through validation, feature derivation, statistics,
//! anomaly detection and the five aggregations, stamps one timestamp across
//! every output, and drives persistence. Batches are fully independent:
//! no state survives from one batch to the next, so a failure is always
//! confined to the batch it occurred in.

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::engine::aggregations::compute_aggregations;
use crate::engine::anomaly::detect_hours_outliers;
use crate::engine::features::enrich;
use crate::engine::stats::compute_batch_statistics;
use crate::models::{Batch, BatchAggregations, BatchStatistics, Config, EnrichedRecord};
use crate::sink::{Collection, DocumentSink};

const MAX_BACKOFF_MS: u64 = 30_000;

/// Everything computed for one batch, ready for the sink.
///
/// Held by the caller when persistence fails so a retry can resubmit
/// without recomputation.
#[derive(Debug, Clone)]
pub struct BatchDocuments {
    pub timestamp: i64,
    pub statistics: BatchStatistics,
    pub anomalies: Vec<crate::models::AnomalyRecord>,
    pub aggregations: BatchAggregations,
    pub enriched: Vec<EnrichedRecord>,
}

impl BatchDocuments {
    /// Total documents this batch writes to the sink.
    pub fn document_count(&self) -> usize {
        1 + self.anomalies.len()
            + self.aggregations.age_groups.len()
            + self.aggregations.education_income.len()
            + self.aggregations.gender_income.len()
            + self.aggregations.work_hours.len()
            + self.aggregations.occupations.len()
            + self.enriched.len()
    }
}

/// What happened to one batch.
#[derive(Debug)]
pub enum BatchOutcome {
    /// No valid records after filtering; nothing was computed or emitted.
    Empty { skipped: usize },
    Processed {
        timestamp: i64,
        records_processed: usize,
        records_skipped: usize,
        anomaly_count: usize,
        documents_persisted: usize,
    },
}

/// Persistence gave up after bounded retries. Carries the computed
/// documents so the caller can resubmit them without recomputation.
#[derive(Debug)]
pub struct BatchFailure {
    pub documents: BatchDocuments,
    pub error: anyhow::Error,
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batch at {} not persisted: {}",
            self.documents.timestamp, self.error
        )
    }
}

impl std::error::Error for BatchFailure {}

/// Runs one batch-processing cycle at a time over an injected sink.
pub struct BatchProcessor<S> {
    sink: Arc<S>,
    zscore_threshold: f64,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl<S: DocumentSink> BatchProcessor<S> {
    pub fn new(sink: Arc<S>, config: &Config) -> Self {
        Self {
            sink,
            zscore_threshold: config.zscore_threshold,
            max_retries: config.sink_max_retries,
            initial_backoff_ms: config.sink_backoff_ms,
        }
    }

    /// Process one batch end to end.
    ///
    /// Malformed records are skipped and counted, never fatal. An empty
    /// batch (after filtering) is a reported no-op. A sink that stays down
    /// after bounded retries yields a [`BatchFailure`] holding the computed
    /// documents.
    pub async fn process(&self, batch: Batch) -> Result<BatchOutcome, BatchFailure> {
        let mut skipped = batch.skipped;
        let mut valid = Vec::with_capacity(batch.records.len());

        for record in batch.records {
            match record.validate() {
                Ok(()) => valid.push(record),
                Err(reason) => {
                    warn!(reason, "🛑 dropping malformed record");
                    skipped += 1;
                }
            }
        }

        if valid.is_empty() {
            info!(skipped, "Batch contained no valid records, skipping cycle");
            return Ok(BatchOutcome::Empty { skipped });
        }

        let timestamp = Utc::now().timestamp();
        let documents = self.compute(valid, timestamp);

        let records_processed = documents.enriched.len();
        let anomaly_count = documents.anomalies.len();

        match self.persist(&documents).await {
            Ok(documents_persisted) => {
                info!(
                    timestamp,
                    records_processed,
                    records_skipped = skipped,
                    anomaly_count,
                    documents_persisted,
                    "✅ Batch processed"
                );
                Ok(BatchOutcome::Processed {
                    timestamp,
                    records_processed,
                    records_skipped: skipped,
                    anomaly_count,
                    documents_persisted,
                })
            }
            Err(error) => Err(BatchFailure { documents, error }),
        }
    }

    /// Pure computation phase: derive, summarize, detect, aggregate. One
    /// timestamp is stamped uniformly across every output.
    pub fn compute(&self, records: Vec<crate::models::Record>, timestamp: i64) -> BatchDocuments {
        let enriched: Vec<EnrichedRecord> = records.into_iter().map(enrich).collect();

        let statistics = compute_batch_statistics(&enriched, timestamp);
        let anomalies = detect_hours_outliers(&statistics, &enriched, self.zscore_threshold);
        let aggregations = compute_aggregations(&enriched, timestamp);

        BatchDocuments {
            timestamp,
            statistics,
            anomalies,
            aggregations,
            enriched,
        }
    }

    /// Persist one batch's documents, each insert independent and retried
    /// with bounded exponential backoff. Resubmitting the same documents
    /// after a failure is exactly this call again.
    pub async fn persist(&self, documents: &BatchDocuments) -> Result<usize> {
        let mut persisted = 0usize;

        persisted += self
            .insert_all(
                Collection::SummaryStatistics,
                std::slice::from_ref(&documents.statistics),
            )
            .await?;
        persisted += self
            .insert_all(Collection::Anomalies, &documents.anomalies)
            .await?;
        persisted += self
            .insert_all(
                Collection::AgeGroupDistribution,
                &documents.aggregations.age_groups,
            )
            .await?;
        persisted += self
            .insert_all(
                Collection::EducationIncome,
                &documents.aggregations.education_income,
            )
            .await?;
        persisted += self
            .insert_all(
                Collection::GenderIncome,
                &documents.aggregations.gender_income,
            )
            .await?;
        persisted += self
            .insert_all(Collection::WorkHours, &documents.aggregations.work_hours)
            .await?;
        persisted += self
            .insert_all(
                Collection::OccupationStats,
                &documents.aggregations.occupations,
            )
            .await?;
        persisted += self
            .insert_all(Collection::RawData, &documents.enriched)
            .await?;

        Ok(persisted)
    }

    async fn insert_all<T: serde::Serialize>(
        &self,
        collection: Collection,
        documents: &[T],
    ) -> Result<usize> {
        for document in documents {
            let value = serde_json::to_value(document)
                .map_err(|e| anyhow!("failed to serialize {} document: {e}", collection.as_str()))?;
            self.insert_with_retry(collection, value).await?;
        }
        Ok(documents.len())
    }

    /// Insert with bounded exponential backoff retry.
    async fn insert_with_retry(&self, collection: Collection, document: Value) -> Result<()> {
        let mut backoff = self.initial_backoff_ms;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.sink.insert(collection, document.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        collection = collection.as_str(),
                        attempt = attempt + 1,
                        error = %e,
                        "Sink insert failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.max_retries {
                debug!("Retrying in {}ms", backoff);
                sleep(Duration::from_millis(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_MS);
            }
        }

        let error = last_error.unwrap_or_else(|| anyhow!("sink insert failed"));
        Err(error.context(format!(
            "insert into {} failed after {} attempts",
            collection.as_str(),
            self.max_retries + 1
        )))
    }
}
