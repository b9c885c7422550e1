//! Query Engine
//!
//! Entry point for "get trace" requests: fetch the trace, then either resolve
//! the selector or let the payload guard pick the level of detail.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::TraceCache;
use crate::client::TraceBackend;
use crate::error::Result;
use crate::fetcher::{FetchedTrace, TraceFetcher};
use crate::types::{TraceRequest, TraceView};
use crate::{guard, navigator};

pub struct TraceQueryEngine {
    fetcher: TraceFetcher,
}

impl TraceQueryEngine {
    pub fn new(backend: Arc<dyn TraceBackend>, cache: Arc<dyn TraceCache>) -> Self {
        Self {
            fetcher: TraceFetcher::new(backend, cache),
        }
    }

    pub fn fetcher(&self) -> &TraceFetcher {
        &self.fetcher
    }

    /// Answer a request; only fetch failures and malformed data are errors.
    pub async fn get_trace(&self, request: &TraceRequest) -> Result<TraceView> {
        let FetchedTrace { trace, source } = if request.refresh {
            self.fetcher.refresh(&request.trace_id).await?
        } else {
            self.fetcher.get_trace(&request.trace_id).await?
        };
        debug!(trace_id = %request.trace_id, ?source, "Trace resolved");

        match &request.selector {
            Some(selector) => Ok(navigator::resolve(&trace, selector).into()),
            None => Ok(guard::decide(trace)?.into()),
        }
    }

    /// Like [`get_trace`](Self::get_trace), with errors folded into
    /// [`TraceView::Error`].
    pub async fn handle(&self, request: &TraceRequest) -> TraceView {
        match self.get_trace(request).await {
            Ok(view) => view,
            Err(e) => {
                warn!(trace_id = %request.trace_id, error = %e, "Trace request failed");
                TraceView::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}
