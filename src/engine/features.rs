//! Feature derivation.
//!
//! Maps one raw record to an enriched record with four derived categorical
//! fields. Pure and total: identical input always yields identical output,
//! which downstream statistics rely on.

use crate::models::{
    AgeGroup, CapitalIncomeCategory, EnrichedRecord, IncomeCategory, Record, WorkHoursCategory,
};

/// Derive the four categorical features for one record.
pub fn enrich(record: Record) -> EnrichedRecord {
    let age_group = age_group(record.age);
    let income_category = income_category(record.income);
    let work_hours_category = work_hours_category(record.hours_per_week);
    let capital_income_category = capital_income_category(record.capital_income);

    EnrichedRecord {
        record,
        age_group,
        income_category,
        work_hours_category,
        capital_income_category,
    }
}

/// Age buckets with thresholds 18/30/45/65. A boundary age falls into the
/// bucket starting at that age.
pub fn age_group(age: i64) -> AgeGroup {
    match age {
        a if a < 18 => AgeGroup::Under18,
        a if a < 30 => AgeGroup::From18To29,
        a if a < 45 => AgeGroup::From30To44,
        a if a < 65 => AgeGroup::From45To64,
        _ => AgeGroup::Over65,
    }
}

pub fn income_category(income: i64) -> IncomeCategory {
    if income == 1 {
        IncomeCategory::High
    } else {
        IncomeCategory::Low
    }
}

/// Work-hours buckets with thresholds 20/40; 40 is inclusive in Full-time.
pub fn work_hours_category(hours_per_week: i64) -> WorkHoursCategory {
    match hours_per_week {
        h if h < 20 => WorkHoursCategory::PartTime,
        h if h <= 40 => WorkHoursCategory::FullTime,
        _ => WorkHoursCategory::Overtime,
    }
}

/// Capital-income buckets: <0 Loss, =0 Break-even, <5000 Low, <20000 Medium,
/// else High.
pub fn capital_income_category(capital_income: i64) -> CapitalIncomeCategory {
    match capital_income {
        c if c < 0 => CapitalIncomeCategory::Loss,
        0 => CapitalIncomeCategory::BreakEven,
        c if c < 5_000 => CapitalIncomeCategory::LowGain,
        c if c < 20_000 => CapitalIncomeCategory::MediumGain,
        _ => CapitalIncomeCategory::HighGain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            age: 25,
            workclass: "Private".to_string(),
            education: "Bachelors".to_string(),
            marital_status: "Never-married".to_string(),
            occupation: "Tech-support".to_string(),
            relationship: "Not-in-family".to_string(),
            race: "White".to_string(),
            gender: "Female".to_string(),
            capital_gain: 0,
            capital_loss: 0,
            hours_per_week: 38,
            native_country: "United-States".to_string(),
            income: 0,
            capital_income: 0,
        }
    }

    #[test]
    fn age_group_boundaries() {
        assert_eq!(age_group(0), AgeGroup::Under18);
        assert_eq!(age_group(17), AgeGroup::Under18);
        assert_eq!(age_group(18), AgeGroup::From18To29);
        assert_eq!(age_group(29), AgeGroup::From18To29);
        assert_eq!(age_group(30), AgeGroup::From30To44);
        assert_eq!(age_group(44), AgeGroup::From30To44);
        assert_eq!(age_group(45), AgeGroup::From45To64);
        assert_eq!(age_group(64), AgeGroup::From45To64);
        assert_eq!(age_group(65), AgeGroup::Over65);
        assert_eq!(age_group(90), AgeGroup::Over65);
    }

    #[test]
    fn work_hours_boundaries() {
        assert_eq!(work_hours_category(19), WorkHoursCategory::PartTime);
        assert_eq!(work_hours_category(20), WorkHoursCategory::FullTime);
        assert_eq!(work_hours_category(40), WorkHoursCategory::FullTime);
        assert_eq!(work_hours_category(41), WorkHoursCategory::Overtime);
    }

    #[test]
    fn capital_income_boundaries() {
        assert_eq!(capital_income_category(-1), CapitalIncomeCategory::Loss);
        assert_eq!(capital_income_category(0), CapitalIncomeCategory::BreakEven);
        assert_eq!(capital_income_category(1), CapitalIncomeCategory::LowGain);
        assert_eq!(
            capital_income_category(4_999),
            CapitalIncomeCategory::LowGain
        );
        assert_eq!(
            capital_income_category(5_000),
            CapitalIncomeCategory::MediumGain
        );
        assert_eq!(
            capital_income_category(19_999),
            CapitalIncomeCategory::MediumGain
        );
        assert_eq!(
            capital_income_category(20_000),
            CapitalIncomeCategory::HighGain
        );
    }

    #[test]
    fn income_indicator_mapping() {
        assert_eq!(income_category(1), IncomeCategory::High);
        assert_eq!(income_category(0), IncomeCategory::Low);
    }

    #[test]
    fn enrich_is_deterministic() {
        let record = sample_record();
        let first = enrich(record.clone());
        let second = enrich(record);
        assert_eq!(first, second);
        assert_eq!(first.age_group, AgeGroup::From18To29);
        assert_eq!(first.income_category, IncomeCategory::Low);
        assert_eq!(first.work_hours_category, WorkHoursCategory::FullTime);
        assert_eq!(
            first.capital_income_category,
            CapitalIncomeCategory::BreakEven
        );
    }

    #[test]
    fn category_labels_match_wire_format() {
        assert_eq!(AgeGroup::Under18.as_str(), "Under 18");
        assert_eq!(IncomeCategory::High.as_str(), "High Income (>50K)");
        assert_eq!(WorkHoursCategory::Overtime.as_str(), "Overtime (>40)");
        assert_eq!(CapitalIncomeCategory::BreakEven.as_str(), "Break-even");

        let json = serde_json::to_value(AgeGroup::From18To29).unwrap();
        assert_eq!(json, serde_json::json!("18-29"));
    }
}
