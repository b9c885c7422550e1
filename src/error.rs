//! Error types for trace-query

use thiserror::Error;

use crate::cache::CacheError;
use crate::client::BackendError;

/// Result type alias
pub type Result<T> = std::result::Result<T, TraceQueryError>;

/// Errors that abort a request.
///
/// Cache failures never show up here: a failed cache read is a miss and a
/// failed cache write only loses the optimization.
#[derive(Error, Debug)]
pub enum TraceQueryError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch trace {trace_id}: {source}")]
    RemoteFetch {
        trace_id: String,
        #[source]
        source: BackendError,
    },

    #[error("Trace not found: {0}")]
    TraceNotFound(String),

    #[error("Malformed trace data for {trace_id}: {reason}")]
    MalformedTrace { trace_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl TraceQueryError {
    pub(crate) fn from_backend(trace_id: &str, err: BackendError) -> Self {
        match err {
            BackendError::NotFound(_) => TraceQueryError::TraceNotFound(trace_id.to_string()),
            other => TraceQueryError::RemoteFetch {
                trace_id: trace_id.to_string(),
                source: other,
            },
        }
    }
}

impl From<serde_json::Error> for TraceQueryError {
    fn from(err: serde_json::Error) -> Self {
        TraceQueryError::Serialization(err.to_string())
    }
}

impl From<CacheError> for TraceQueryError {
    fn from(err: CacheError) -> Self {
        TraceQueryError::Config(format!("cache unavailable: {}", err))
    }
}
