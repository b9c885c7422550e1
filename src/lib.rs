//! Trace query layer for an LLM observability backend
//!
//! Serves traces, single observations and compiled prompts to tool-calling
//! clients that can only take small responses.
//!
//! ## Module Structure
//!
//! - `types`: Trace data model, request selector, response views
//! - `cache`: Trace snapshot cache (sqlite, file, memory)
//! - `client`: Backend clients (trace and prompt retrieval)
//! - `fetcher`: Cache-first trace retrieval
//! - `navigator`: Selector resolution within a trace
//! - `guard`: Payload size policy for unselected requests
//! - `engine`: Request entry point
//! - `prompt`: Prompt retrieval and compilation
//! - `config`: Environment / TOML configuration

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod navigator;
pub mod prompt;
pub mod types;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use cache::{
    CacheEntry, CacheError, FileTraceCache, MemoryTraceCache, SqliteTraceCache, TraceCache,
};
pub use client::{BackendError, HttpTraceBackend, PromptBackend, TraceBackend};
pub use config::{BackendConfig, CacheConfig, CacheKind, QueryConfig};
pub use engine::TraceQueryEngine;
pub use error::{Result, TraceQueryError};
pub use fetcher::{FetchSource, FetchedTrace, TraceFetcher};
pub use guard::{PayloadDecision, MAX_FULL_PAYLOAD_BYTES};
pub use navigator::Resolution;
pub use prompt::{ChatMessage, CompiledPrompt, Prompt, PromptBody, PromptService};
pub use types::{Observation, ObservationRef, Selector, Trace, TraceRequest, TraceView};
