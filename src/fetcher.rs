//! Trace Fetcher
//!
//! Serves a trace from the cache when an entry exists and otherwise makes a
//! single remote call, then tries to populate the cache. Cached entries are
//! trusted unconditionally: there is no freshness check, and staleness is
//! only cleared by an explicit refresh.
//!
//! Concurrent misses for the same id each fetch and write; the last write
//! wins.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::TraceCache;
use crate::client::TraceBackend;
use crate::error::{Result, TraceQueryError};
use crate::types::Trace;

/// Where a fetched trace came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// `cached_at` is when the serving entry was written
    Cache { cached_at: DateTime<Utc> },
    /// `cached` is false when the follow-up cache write failed
    Remote { cached: bool },
}

#[derive(Debug, Clone)]
pub struct FetchedTrace {
    pub trace: Trace,
    pub source: FetchSource,
}

pub struct TraceFetcher {
    backend: Arc<dyn TraceBackend>,
    cache: Arc<dyn TraceCache>,
}

impl TraceFetcher {
    pub fn new(backend: Arc<dyn TraceBackend>, cache: Arc<dyn TraceCache>) -> Self {
        Self { backend, cache }
    }

    /// Cache first, remote on miss.
    pub async fn get_trace(&self, trace_id: &str) -> Result<FetchedTrace> {
        validate_trace_id(trace_id)?;

        match self.cache.read(trace_id) {
            Ok(Some(entry)) => {
                debug!(
                    trace_id = %trace_id,
                    cached_at = %entry.cached_at,
                    "Trace cache hit"
                );
                return Ok(FetchedTrace {
                    trace: entry.trace,
                    source: FetchSource::Cache {
                        cached_at: entry.cached_at,
                    },
                });
            }
            Ok(None) => debug!(trace_id = %trace_id, "Trace cache miss"),
            Err(e) => warn!(trace_id = %trace_id, error = %e, "Trace cache read failed, treating as miss"),
        }

        self.fetch_remote(trace_id).await
    }

    /// Skip the cache lookup and replace the entry with a fresh fetch.
    pub async fn refresh(&self, trace_id: &str) -> Result<FetchedTrace> {
        validate_trace_id(trace_id)?;
        self.fetch_remote(trace_id).await
    }

    async fn fetch_remote(&self, trace_id: &str) -> Result<FetchedTrace> {
        info!(trace_id = %trace_id, "Fetching trace from backend");

        let raw = self
            .backend
            .fetch_trace(trace_id)
            .await
            .map_err(|e| TraceQueryError::from_backend(trace_id, e))?;

        // Malformed payloads never reach the cache.
        let trace = Trace::from_value(trace_id, raw)?;

        let cached = match self.cache.write(trace_id, &trace) {
            Ok(()) => true,
            Err(e) => {
                warn!(trace_id = %trace_id, error = %e, "Failed to cache trace");
                false
            }
        };

        Ok(FetchedTrace {
            trace,
            source: FetchSource::Remote { cached },
        })
    }
}

fn validate_trace_id(trace_id: &str) -> Result<()> {
    if trace_id.trim().is_empty() {
        return Err(TraceQueryError::InvalidRequest(
            "trace_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes for the fetcher's collaborators.

    use async_trait::async_trait;
    use dashmap::DashMap;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::{CacheEntry, CacheError, TraceCache};
    use crate::client::{BackendError, TraceBackend};
    use crate::types::Trace;

    /// Serves canned payloads and counts calls
    #[derive(Default)]
    pub struct FakeBackend {
        traces: DashMap<String, Value>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        pub fn with(trace_id: &str, payload: Value) -> Self {
            let backend = Self::default();
            backend.insert(trace_id, payload);
            backend
        }

        pub fn insert(&self, trace_id: &str, payload: Value) {
            self.traces.insert(trace_id.to_string(), payload);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TraceBackend for FakeBackend {
        async fn fetch_trace(&self, trace_id: &str) -> Result<Value, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.traces
                .get(trace_id)
                .map(|v| v.value().clone())
                .ok_or_else(|| BackendError::NotFound(trace_id.to_string()))
        }
    }

    /// Backend that is always unreachable
    pub struct DownBackend;

    #[async_trait]
    impl TraceBackend for DownBackend {
        async fn fetch_trace(&self, _trace_id: &str) -> Result<Value, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
    }

    /// Cache whose every operation fails
    pub struct BrokenCache;

    impl TraceCache for BrokenCache {
        fn read(&self, _trace_id: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk gone")))
        }

        fn write(&self, _trace_id: &str, _trace: &Trace) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk full")))
        }
    }
}
