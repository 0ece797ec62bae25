use serde::{Deserialize, Serialize};

/// Age buckets derived from a record's age field.
///
/// Variant order matches bucket order so sorted output is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "Under 18")]
    Under18,
    #[serde(rename = "18-29")]
    From18To29,
    #[serde(rename = "30-44")]
    From30To44,
    #[serde(rename = "45-64")]
    From45To64,
    #[serde(rename = "65+")]
    Over65,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Under18 => "Under 18",
            AgeGroup::From18To29 => "18-29",
            AgeGroup::From30To44 => "30-44",
            AgeGroup::From45To64 => "45-64",
            AgeGroup::Over65 => "65+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncomeCategory {
    #[serde(rename = "High Income (>50K)")]
    High,
    #[serde(rename = "Low Income (<=50K)")]
    Low,
}

impl IncomeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeCategory::High => "High Income (>50K)",
            IncomeCategory::Low => "Low Income (<=50K)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkHoursCategory {
    #[serde(rename = "Part-time (<20)")]
    PartTime,
    #[serde(rename = "Full-time (20-40)")]
    FullTime,
    #[serde(rename = "Overtime (>40)")]
    Overtime,
}

impl WorkHoursCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkHoursCategory::PartTime => "Part-time (<20)",
            WorkHoursCategory::FullTime => "Full-time (20-40)",
            WorkHoursCategory::Overtime => "Overtime (>40)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapitalIncomeCategory {
    #[serde(rename = "Loss")]
    Loss,
    #[serde(rename = "Break-even")]
    BreakEven,
    #[serde(rename = "Low Gain")]
    LowGain,
    #[serde(rename = "Medium Gain")]
    MediumGain,
    #[serde(rename = "High Gain")]
    HighGain,
}

impl CapitalIncomeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapitalIncomeCategory::Loss => "Loss",
            CapitalIncomeCategory::BreakEven => "Break-even",
            CapitalIncomeCategory::LowGain => "Low Gain",
            CapitalIncomeCategory::MediumGain => "Medium Gain",
            CapitalIncomeCategory::HighGain => "High Gain",
        }
    }
}

/// One raw census record as delivered by the source. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub age: i64,
    pub workclass: String,
    pub education: String,
    pub marital_status: String,
    pub occupation: String,
    pub relationship: String,
    pub race: String,
    pub gender: String,
    pub capital_gain: i64,
    pub capital_loss: i64,
    pub hours_per_week: i64,
    pub native_country: String,
    /// Binary income indicator: 1 = >50K, 0 = <=50K.
    pub income: i64,
    /// capital_gain - capital_loss, precomputed upstream.
    pub capital_income: i64,
}

impl Record {
    /// Required-field validation. Records failing this are skipped, not fatal.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.age < 0 {
            return Err("negative age");
        }
        if self.hours_per_week < 0 {
            return Err("negative hours_per_week");
        }
        if self.income != 0 && self.income != 1 {
            return Err("income indicator not 0/1");
        }
        if self.occupation.is_empty() {
            return Err("empty occupation");
        }
        if self.education.is_empty() {
            return Err("empty education");
        }
        if self.gender.is_empty() {
            return Err("empty gender");
        }
        Ok(())
    }
}

/// A record plus the four derived categorical features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub age_group: AgeGroup,
    pub income_category: IncomeCategory,
    pub work_hours_category: WorkHoursCategory,
    pub capital_income_category: CapitalIncomeCategory,
}

/// One bounded group of records processed as an atomic unit.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub records: Vec<Record>,
    /// Records rejected upstream (e.g. malformed CSV lines).
    pub skipped: usize,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            skipped: 0,
        }
    }

    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-batch numeric summary statistics. Population stddev over the batch;
/// a single-record batch has stddev 0, never NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub timestamp: i64,
    pub batch_size: u64,
    pub avg_age: f64,
    pub stddev_age: f64,
    pub min_age: i64,
    pub max_age: i64,
    pub avg_hours: f64,
    pub stddev_hours: f64,
    pub avg_capital_income: f64,
    pub stddev_capital_income: f64,
    pub count_high_income: u64,
    pub count_low_income: u64,
}

/// A record flagged as a statistical outlier within its batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    #[serde(flatten)]
    pub record: EnrichedRecord,
    pub z_score: f64,
    pub anomaly_type: String,
    pub detected_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupCount {
    pub age_group: AgeGroup,
    pub count: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationIncomeCount {
    pub education: String,
    pub income_category: IncomeCategory,
    pub count: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderIncomeCount {
    pub gender: String,
    pub income_category: IncomeCategory,
    pub count: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkHoursCount {
    pub work_hours_category: WorkHoursCategory,
    pub count: u64,
    pub timestamp: i64,
}

/// Per-occupation averages. Means are null (not zero) when a group has no
/// observations, preserving the "no data" / "zero" distinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupationStats {
    pub occupation: String,
    pub avg_age: Option<f64>,
    pub avg_hours: Option<f64>,
    pub count: u64,
    pub timestamp: i64,
}

/// The five independent grouped views of one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchAggregations {
    pub age_groups: Vec<AgeGroupCount>,
    pub education_income: Vec<EducationIncomeCount>,
    pub gender_income: Vec<GenderIncomeCount>,
    pub work_hours: Vec<WorkHoursCount>,
    pub occupations: Vec<OccupationStats>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub stream_dir: String,
    pub trigger_interval_secs: u64,
    pub zscore_threshold: f64,
    pub sink_max_retries: u32,
    pub sink_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./censusflow.db".to_string());

        let stream_dir =
            std::env::var("STREAM_DIR").unwrap_or_else(|_| "./stream_data".to_string());

        let trigger_interval_secs = env_or("TRIGGER_INTERVAL_SECS", 10u64);

        let zscore_threshold = env_or(
            "ZSCORE_THRESHOLD",
            crate::engine::anomaly::Z_SCORE_THRESHOLD,
        );
        let zscore_threshold = if zscore_threshold > 0.0 {
            zscore_threshold
        } else {
            tracing::warn!(
                value = zscore_threshold,
                default = crate::engine::anomaly::Z_SCORE_THRESHOLD,
                "ZSCORE_THRESHOLD must be positive, using default"
            );
            crate::engine::anomaly::Z_SCORE_THRESHOLD
        };

        let sink_max_retries = env_or("SINK_MAX_RETRIES", 3u32);
        let sink_backoff_ms = env_or("SINK_BACKOFF_MS", 500u64);

        Ok(Self {
            database_path,
            stream_dir,
            trigger_interval_secs,
            zscore_threshold,
            sink_max_retries,
            sink_backoff_ms,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    parse_env_value(key, std::env::var(key).ok(), default)
}

/// A set-but-unparseable value falls back to the default with a warning;
/// silently running with a misread interval or threshold is worse than noise.
fn parse_env_value<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Unparseable value in environment, using default");
            default
        }),
    }
}
