//! Per-batch grouped aggregations.
//!
//! Five independent views of one enriched batch: age-group counts,
//! education x income counts, gender x income counts, work-hours-category
//! counts, and per-occupation averages. Nothing is merged across batches;
//! temporal merging belongs to whatever reads the persisted time series.

use std::collections::BTreeMap;

use crate::models::{
    AgeGroupCount, BatchAggregations, EducationIncomeCount, EnrichedRecord, GenderIncomeCount,
    OccupationStats, WorkHoursCount,
};

#[derive(Default)]
struct OccupationAccumulator {
    count: u64,
    age_sum: f64,
    hours_sum: f64,
}

/// Compute all five groupings over one batch.
///
/// Groups accumulate in BTreeMaps so output order is deterministic (sorted
/// by grouping key), keeping repeated runs bit-identical.
pub fn compute_aggregations(records: &[EnrichedRecord], timestamp: i64) -> BatchAggregations {
    let mut age_groups = BTreeMap::new();
    let mut education_income = BTreeMap::new();
    let mut gender_income = BTreeMap::new();
    let mut work_hours = BTreeMap::new();
    let mut occupations: BTreeMap<String, OccupationAccumulator> = BTreeMap::new();

    for enriched in records {
        let r = &enriched.record;

        *age_groups.entry(enriched.age_group).or_insert(0u64) += 1;
        *education_income
            .entry((r.education.clone(), enriched.income_category))
            .or_insert(0u64) += 1;
        *gender_income
            .entry((r.gender.clone(), enriched.income_category))
            .or_insert(0u64) += 1;
        *work_hours
            .entry(enriched.work_hours_category)
            .or_insert(0u64) += 1;

        let occ = occupations.entry(r.occupation.clone()).or_default();
        occ.count += 1;
        occ.age_sum += r.age as f64;
        occ.hours_sum += r.hours_per_week as f64;
    }

    BatchAggregations {
        age_groups: age_groups
            .into_iter()
            .map(|(age_group, count)| AgeGroupCount {
                age_group,
                count,
                timestamp,
            })
            .collect(),
        education_income: education_income
            .into_iter()
            .map(|((education, income_category), count)| EducationIncomeCount {
                education,
                income_category,
                count,
                timestamp,
            })
            .collect(),
        gender_income: gender_income
            .into_iter()
            .map(|((gender, income_category), count)| GenderIncomeCount {
                gender,
                income_category,
                count,
                timestamp,
            })
            .collect(),
        work_hours: work_hours
            .into_iter()
            .map(|(work_hours_category, count)| WorkHoursCount {
                work_hours_category,
                count,
                timestamp,
            })
            .collect(),
        occupations: occupations
            .into_iter()
            .map(|(occupation, acc)| OccupationStats {
                occupation,
                avg_age: (acc.count > 0).then(|| acc.age_sum / acc.count as f64),
                avg_hours: (acc.count > 0).then(|| acc.hours_sum / acc.count as f64),
                count: acc.count,
                timestamp,
            })
            .collect(),
    }
}
