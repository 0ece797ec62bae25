//! Batch delivery boundary.
//!
//! The engine pulls one [`Batch`] at a time through [`BatchSource`] and
//! never assumes a transport; the file-drop implementation below is one of
//! several possible collaborators (queue, socket, ...).

pub mod csv_dir;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Batch;

pub use csv_dir::CsvDirSource;

/// One-batch-at-a-time delivery. `Ok(None)` means nothing is available
/// right now; the caller decides when to poll again.
#[async_trait]
pub trait BatchSource: Send {
    async fn next_batch(&mut self) -> Result<Option<Batch>>;
}
