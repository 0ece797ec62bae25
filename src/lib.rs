//! CensusFlow Backend Library
//!
//! Exposes the micro-batch engine, source and sink modules for use by
//! binaries and tests.

pub mod engine;
pub mod models;
pub mod sink;
pub mod source;
