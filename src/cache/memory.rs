//! In-process trace cache

use dashmap::DashMap;

use super::{CacheEntry, CacheError, TraceCache};
use crate::types::Trace;

#[derive(Default)]
pub struct MemoryTraceCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryTraceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, trace_id: &str) -> bool {
        self.entries.contains_key(trace_id)
    }
}

impl TraceCache for MemoryTraceCache {
    fn read(&self, trace_id: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.get(trace_id).map(|entry| entry.value().clone()))
    }

    fn write(&self, trace_id: &str, trace: &Trace) -> Result<(), CacheError> {
        self.entries
            .insert(trace_id.to_string(), CacheEntry::new(trace_id, trace));
        Ok(())
    }
}
