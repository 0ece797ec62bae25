//! Batch statistics.
//!
//! Computes numeric summary statistics for one enriched batch using
//! Welford's online algorithm for numerically stable variance. Each batch is
//! independent: nothing carries across batches.

use crate::models::{BatchStatistics, EnrichedRecord, IncomeCategory};

/// Welford accumulator. Population variance: every record in the batch is
/// the whole population, so a single-record batch has stddev 0, not NaN.
#[derive(Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    #[inline]
    fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    #[inline]
    fn std_dev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }
}

/// Compute summary statistics for one non-empty batch.
///
/// `timestamp` is the single batch arrival timestamp assigned by the
/// processor; it is stamped here rather than read from the clock so that
/// recomputation of the same batch is bit-identical.
pub fn compute_batch_statistics(records: &[EnrichedRecord], timestamp: i64) -> BatchStatistics {
    let mut age = RunningStats::default();
    let mut hours = RunningStats::default();
    let mut capital_income = RunningStats::default();

    let mut min_age = i64::MAX;
    let mut max_age = i64::MIN;
    let mut count_high_income = 0u64;
    let mut count_low_income = 0u64;

    for enriched in records {
        let r = &enriched.record;
        age.update(r.age as f64);
        hours.update(r.hours_per_week as f64);
        capital_income.update(r.capital_income as f64);

        min_age = min_age.min(r.age);
        max_age = max_age.max(r.age);

        match enriched.income_category {
            IncomeCategory::High => count_high_income += 1,
            IncomeCategory::Low => count_low_income += 1,
        }
    }

    BatchStatistics {
        timestamp,
        batch_size: records.len() as u64,
        avg_age: age.mean,
        stddev_age: age.std_dev(),
        min_age,
        max_age,
        avg_hours: hours.mean,
        stddev_hours: hours.std_dev(),
        avg_capital_income: capital_income.mean,
        stddev_capital_income: capital_income.std_dev(),
        count_high_income,
        count_low_income,
    }
}
