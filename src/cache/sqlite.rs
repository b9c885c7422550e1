//! SQLite-backed trace cache

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{decode_entry, CacheEntry, CacheError, TraceCache};
use crate::types::Trace;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trace_cache (
    trace_id TEXT PRIMARY KEY,
    entry TEXT NOT NULL
);
"#;

pub struct SqliteTraceCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTraceCache {
    /// Open (or create) the cache database at `path`
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Trace cache opened at {:?}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create in-memory cache (for testing)
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl TraceCache for SqliteTraceCache {
    fn read(&self, trace_id: &str) -> Result<Option<CacheEntry>, CacheError> {
        let raw: Option<String> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT entry FROM trace_cache WHERE trace_id = ?1",
                params![trace_id],
                |row| row.get(0),
            )
            .optional()?
        };
        Ok(raw.and_then(|raw| decode_entry(trace_id, &raw)))
    }

    fn write(&self, trace_id: &str, trace: &Trace) -> Result<(), CacheError> {
        let entry = serde_json::to_string(&CacheEntry::new(trace_id, trace))?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO trace_cache (trace_id, entry) VALUES (?1, ?2)",
            params![trace_id, entry],
        )?;
        tx.commit()?;
        Ok(())
    }
}
