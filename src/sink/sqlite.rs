//! SQLite-backed document store.
//!
//! One table per collection, one JSON document per row. WAL mode for
//! concurrent reads during writes, prepared statement caching for the hot
//! insert path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Collection, DocumentSink, ResetReport};

const PRAGMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
"#;

/// Document store over a single SQLite connection.
pub struct DbDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DbDocumentStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open database at {}", db_path))?;

        conn.execute_batch(PRAGMA_SQL)
            .context("Failed to apply database pragmas")?;

        for collection in Collection::ALL {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     document TEXT NOT NULL,
                     inserted_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
                 );
                 CREATE INDEX IF NOT EXISTS idx_{table}_inserted_at
                     ON {table}(inserted_at DESC);",
                table = collection.as_str()
            ))
            .with_context(|| format!("Failed to create collection {}", collection.as_str()))?;
        }

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap_or_default();
        if journal_mode.to_lowercase() != "wal" {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        info!("📊 Document store initialized at: {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of documents currently in a collection.
    pub fn count(&self, collection: Collection) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.as_str()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Most recently inserted documents in a collection, newest first.
    pub fn get_recent(&self, collection: Collection, limit: usize) -> Result<Vec<Value>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT document FROM {} ORDER BY id DESC LIMIT ?1",
            collection.as_str()
        ))?;

        let documents = stmt
            .query_map([limit], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|json| serde_json::from_str(&json).ok())
            .collect();

        Ok(documents)
    }
}

#[async_trait]
impl DocumentSink for DbDocumentStore {
    async fn insert(&self, collection: Collection, document: Value) -> Result<()> {
        // Serialize outside the lock
        let json = serde_json::to_string(&document)?;

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "INSERT INTO {} (document, inserted_at) VALUES (?1, strftime('%s', 'now'))",
            collection.as_str()
        ))?;
        stmt.execute(params![json])
            .with_context(|| format!("Failed to insert into {}", collection.as_str()))?;

        Ok(())
    }

    async fn reset(&self) -> Result<ResetReport> {
        let conn = self.conn.lock();
        let mut report = ResetReport::default();

        for collection in Collection::ALL {
            // DELETE is atomic per table: the collection either fully
            // clears or the statement fails with nothing removed.
            match conn.execute(&format!("DELETE FROM {}", collection.as_str()), []) {
                Ok(removed) => {
                    info!(
                        collection = collection.as_str(),
                        removed, "🗑️  Collection cleared"
                    );
                    report.cleared.push(collection.as_str());
                }
                Err(e) => {
                    warn!(collection = collection.as_str(), error = %e, "Reset failed");
                    report.failed.push((collection.as_str(), e.to_string()));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_store() -> DbDocumentStore {
        DbDocumentStore::new(":memory:").expect("Failed to create store")
    }

    #[tokio::test]
    async fn insert_and_retrieve_round_trips() {
        let store = memory_store();

        let doc = json!({"avg_age": 41.5, "timestamp": 1_700_000_000});
        store
            .insert(Collection::SummaryStatistics, doc.clone())
            .await
            .expect("Failed to insert");

        assert_eq!(store.count(Collection::SummaryStatistics).unwrap(), 1);

        let recent = store
            .get_recent(Collection::SummaryStatistics, 10)
            .expect("Failed to query");
        assert_eq!(recent, vec![doc]);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = memory_store();

        store
            .insert(Collection::Anomalies, json!({"z_score": 4.2}))
            .await
            .unwrap();

        assert_eq!(store.count(Collection::Anomalies).unwrap(), 1);
        assert_eq!(store.count(Collection::RawData).unwrap(), 0);
        assert_eq!(store.count(Collection::WorkHours).unwrap(), 0);
    }

    #[tokio::test]
    async fn get_recent_returns_newest_first() {
        let store = memory_store();

        for i in 0..5 {
            store
                .insert(Collection::RawData, json!({"n": i}))
                .await
                .unwrap();
        }

        let recent = store.get_recent(Collection::RawData, 2).unwrap();
        assert_eq!(recent, vec![json!({"n": 4}), json!({"n": 3})]);
    }

    #[tokio::test]
    async fn reset_clears_every_collection_and_is_idempotent() {
        let store = memory_store();

        for collection in Collection::ALL {
            store.insert(collection, json!({"x": 1})).await.unwrap();
        }

        let report = store.reset().await.expect("Failed to reset");
        assert!(report.all_cleared());
        assert_eq!(report.cleared.len(), Collection::ALL.len());

        for collection in Collection::ALL {
            assert_eq!(store.count(collection).unwrap(), 0);
        }

        // Second reset on empty collections still succeeds.
        let report = store.reset().await.expect("Failed to reset twice");
        assert!(report.all_cleared());
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("censusflow_test.db");
        let path = path.to_str().unwrap();

        {
            let store = DbDocumentStore::new(path).unwrap();
            store
                .insert(Collection::WorkHours, json!({"count": 3}))
                .await
                .unwrap();
        }

        let store = DbDocumentStore::new(path).unwrap();
        assert_eq!(store.count(Collection::WorkHours).unwrap(), 1);
    }
}
