//! Trace snapshot cache
//!
//! Maps a trace id to the last snapshot fetched from the backend. Entries have
//! no expiry: an entry stays valid until a new remote fetch replaces it.
//!
//! Three media are available:
//! - `sqlite`: durable, one row per trace (default)
//! - `file`: durable, one JSON file per trace, written via atomic rename
//! - `memory`: process lifetime only

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileTraceCache;
pub use memory::MemoryTraceCache;
pub use sqlite::SqliteTraceCache;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::Trace;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value store for trace snapshots.
///
/// `write` must be all-or-nothing: a reader sees either the previous entry
/// or the new one, never a mix. A failed write leaves the previous entry in
/// place.
pub trait TraceCache: Send + Sync {
    /// `Ok(None)` on a miss. Entries that can no longer be decoded are misses.
    fn read(&self, trace_id: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Replace the entry for `trace_id` wholesale.
    fn write(&self, trace_id: &str, trace: &Trace) -> Result<(), CacheError>;
}

/// Stored form of a cache entry, shared by every medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub trace_id: String,
    pub cached_at: DateTime<Utc>,
    pub trace: Trace,
}

impl CacheEntry {
    pub fn new(trace_id: &str, trace: &Trace) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            cached_at: Utc::now(),
            trace: trace.clone(),
        }
    }
}

/// Decode a stored entry, treating garbage or a foreign id as a miss.
pub(crate) fn decode_entry(trace_id: &str, raw: &str) -> Option<CacheEntry> {
    match serde_json::from_str::<CacheEntry>(raw) {
        Ok(entry) if entry.trace_id == trace_id => Some(entry),
        Ok(entry) => {
            warn!(
                trace_id = %trace_id,
                stored_id = %entry.trace_id,
                "Cache entry belongs to a different trace, ignoring"
            );
            None
        }
        Err(e) => {
            warn!(trace_id = %trace_id, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}
