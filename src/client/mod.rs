//! Observability backend clients
//!
//! The query layer consumes exactly two remote operations: fetch a full trace
//! by id and fetch a prompt template. Both sit behind traits so the engine can
//! run against a fake backend.

pub mod http;

pub use http::HttpTraceBackend;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::prompt::Prompt;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Remote source of full trace payloads.
#[async_trait]
pub trait TraceBackend: Send + Sync {
    /// Fetch the full trace, observations included, as raw JSON.
    async fn fetch_trace(&self, trace_id: &str) -> Result<Value, BackendError>;
}

/// Remote source of prompt templates.
#[async_trait]
pub trait PromptBackend: Send + Sync {
    /// Fetch a prompt by name. Without `version` or `label` the backend
    /// returns the version labelled `production`.
    async fn fetch_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
    ) -> Result<Prompt, BackendError>;
}
