//! Micro-batch aggregation and anomaly-detection engine.

pub mod aggregations;
pub mod anomaly;
pub mod features;
pub mod processor;
pub mod stats;
