//! In-memory sink for tests.
//!
//! Records every inserted document per collection and can be told to fail
//! the next N inserts, which is how the processor's retry path is exercised.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

use super::{Collection, DocumentSink, ResetReport};

#[derive(Default)]
pub struct MemorySink {
    documents: Mutex<HashMap<Collection, Vec<Value>>>,
    fail_next: Mutex<u32>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` insert calls fail.
    pub fn fail_next(&self, n: u32) {
        *self.fail_next.lock() = n;
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.documents
            .lock()
            .get(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn documents(&self, collection: Collection) -> Vec<Value> {
        self.documents
            .lock()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn insert(&self, collection: Collection, document: Value) -> Result<()> {
        {
            let mut fail_next = self.fail_next.lock();
            if *fail_next > 0 {
                *fail_next -= 1;
                bail!("injected sink failure");
            }
        }

        self.documents
            .lock()
            .entry(collection)
            .or_default()
            .push(document);
        Ok(())
    }

    async fn reset(&self) -> Result<ResetReport> {
        self.documents.lock().clear();
        Ok(ResetReport {
            cleared: Collection::ALL.iter().map(|c| c.as_str()).collect(),
            failed: Vec::new(),
        })
    }
}
