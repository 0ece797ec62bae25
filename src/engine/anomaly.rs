//! Anomaly detection.
//!
//! Flags records whose hours-per-week deviates from the batch mean by more
//! than a z-score threshold. The statistics are computed from the same batch
//! the records came from; batches with flat hours (stddev <= 0) produce no
//! anomalies since a z-score is meaningless there.

use tracing::info;

use crate::models::{AnomalyRecord, BatchStatistics, EnrichedRecord};

/// Default z-score threshold. Single monitored dimension for now:
/// hours-per-week. More dimensions can be added without changing the
/// contract shape.
pub const Z_SCORE_THRESHOLD: f64 = 3.0;

/// Tag identifying the detection rule on persisted anomalies.
pub const HOURS_OUTLIER: &str = "hours_outlier";

/// Detect hours-per-week outliers in one enriched batch.
///
/// Emits nothing when `stats.stddev_hours <= 0` (flat batch, division
/// guard). Otherwise every record with `|hours - mean| / stddev > threshold`
/// is flagged, stamped with the batch timestamp.
pub fn detect_hours_outliers(
    stats: &BatchStatistics,
    records: &[EnrichedRecord],
    threshold: f64,
) -> Vec<AnomalyRecord> {
    if stats.stddev_hours <= 0.0 {
        return Vec::new();
    }

    let mut anomalies = Vec::new();

    for enriched in records {
        let z_score =
            (enriched.record.hours_per_week as f64 - stats.avg_hours).abs() / stats.stddev_hours;

        if z_score > threshold {
            info!(
                hours = enriched.record.hours_per_week,
                mean = stats.avg_hours,
                z_score,
                "🚨 Hours outlier detected"
            );

            anomalies.push(AnomalyRecord {
                record: enriched.clone(),
                z_score,
                anomaly_type: HOURS_OUTLIER.to_string(),
                detected_at: stats.timestamp,
            });
        }
    }

    anomalies
}
