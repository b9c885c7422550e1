//! Payload Guard
//!
//! Decides how much of a trace to return when no selector narrows the
//! request. Traces whose canonical JSON fits in [`MAX_FULL_PAYLOAD_BYTES`] are
//! returned whole; larger ones are replaced by a structural summary listing
//! every observation's index and name.

use tracing::debug;

use crate::error::Result;
use crate::types::{ObservationRef, Trace, TraceView};

/// Largest serialized trace returned verbatim (40 KiB)
pub const MAX_FULL_PAYLOAD_BYTES: usize = 40 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadDecision {
    Full(Trace),
    Summary {
        size_bytes: usize,
        threshold_bytes: usize,
        observations: Vec<ObservationRef>,
    },
}

/// Canonical serialized size of a trace, in UTF-8 bytes
pub fn serialized_size(trace: &Trace) -> Result<usize> {
    Ok(serde_json::to_vec(trace)?.len())
}

pub fn decide(trace: Trace) -> Result<PayloadDecision> {
    let size_bytes = serialized_size(&trace)?;
    if size_bytes <= MAX_FULL_PAYLOAD_BYTES {
        return Ok(PayloadDecision::Full(trace));
    }

    debug!(
        trace_id = trace.id().unwrap_or_default(),
        size_bytes,
        observations = trace.observation_count(),
        "Trace too large, returning summary"
    );
    Ok(PayloadDecision::Summary {
        size_bytes,
        threshold_bytes: MAX_FULL_PAYLOAD_BYTES,
        observations: trace.observation_refs(),
    })
}

impl From<PayloadDecision> for TraceView {
    fn from(decision: PayloadDecision) -> Self {
        match decision {
            PayloadDecision::Full(trace) => TraceView::FullPayload { trace },
            PayloadDecision::Summary {
                size_bytes,
                threshold_bytes,
                observations,
            } => TraceView::StructuralSummary {
                hint: format!(
                    "Trace is {} bytes (limit {}); request a single observation by index or name",
                    size_bytes, threshold_bytes
                ),
                size_bytes,
                threshold_bytes,
                observations,
            },
        }
    }
}
