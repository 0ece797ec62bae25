//! Persistence boundary.
//!
//! The engine hands finished documents to a [`DocumentSink`]; everything
//! about the store behind it (SQLite here, anything document-shaped in
//! principle) stays on the far side of the trait.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemorySink;
pub use sqlite::DbDocumentStore;

/// The eight result collections, one per output kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    SummaryStatistics,
    Anomalies,
    AgeGroupDistribution,
    EducationIncome,
    GenderIncome,
    WorkHours,
    OccupationStats,
    RawData,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::SummaryStatistics,
        Collection::Anomalies,
        Collection::AgeGroupDistribution,
        Collection::EducationIncome,
        Collection::GenderIncome,
        Collection::WorkHours,
        Collection::OccupationStats,
        Collection::RawData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::SummaryStatistics => "summary_statistics",
            Collection::Anomalies => "anomalies",
            Collection::AgeGroupDistribution => "age_group_distribution",
            Collection::EducationIncome => "education_income",
            Collection::GenderIncome => "gender_income",
            Collection::WorkHours => "work_hours",
            Collection::OccupationStats => "occupation_stats",
            Collection::RawData => "raw_data",
        }
    }
}

/// Outcome of an administrative reset, per collection.
#[derive(Debug, Clone, Default)]
pub struct ResetReport {
    pub cleared: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

impl ResetReport {
    pub fn all_cleared(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Document persistence. Each insert is independent; there is no
/// multi-document transaction across a batch.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Insert one serialized document into a collection.
    async fn insert(&self, collection: Collection, document: Value) -> Result<()>;

    /// Clear all collections. Idempotent; a collection either fully clears
    /// or is reported as failed, never partially deleted.
    async fn reset(&self) -> Result<ResetReport>;
}
