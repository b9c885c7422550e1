//! Trace data model and the request/response shapes of the query layer.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, TraceQueryError};

static NULL: Value = Value::Null;

// ============================================================================
// TRACE SNAPSHOT
// ============================================================================

/// A trace exactly as the observability backend returned it.
///
/// Only `observations` is checked: it must be an array of objects. Every
/// other field is opaque metadata, read leniently through the accessors and
/// serialized back byte-for-byte in key order, explicit nulls included.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    payload: Map<String, Value>,
}

impl Trace {
    /// Wrap a raw backend payload.
    ///
    /// A payload without an `observations` sequence is malformed rather than
    /// empty: callers must be able to tell it apart from a trace with no
    /// recorded steps.
    pub fn from_value(trace_id: &str, value: Value) -> Result<Self> {
        let malformed = |reason: String| TraceQueryError::MalformedTrace {
            trace_id: trace_id.to_string(),
            reason,
        };
        let payload = match value {
            Value::Object(payload) => payload,
            other => {
                return Err(malformed(format!(
                    "expected a JSON object, found {}",
                    json_type(&other)
                )))
            }
        };
        check_observations(&payload).map_err(malformed)?;
        Ok(Self { payload })
    }

    /// Backend trace id, when the payload carries one as a string
    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.str_field("userId")
    }

    pub fn session_id(&self) -> Option<&str> {
        self.str_field("sessionId")
    }

    /// `None` when absent or not an RFC 3339 string
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.payload.get("timestamp").and_then(parse_timestamp)
    }

    /// Latency in seconds, when the backend sent a number
    pub fn latency(&self) -> Option<f64> {
        self.payload.get("latency").and_then(Value::as_f64)
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.payload.get("totalCost").and_then(Value::as_f64)
    }

    /// Any top-level field, untouched
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn observation_count(&self) -> usize {
        self.observation_values().len()
    }

    pub fn observation(&self, index: usize) -> Option<Observation<'_>> {
        self.observation_values()
            .get(index)
            .and_then(Value::as_object)
            .map(|fields| Observation { fields })
    }

    pub fn observations(&self) -> impl Iterator<Item = Observation<'_>> {
        self.observation_values()
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| Observation { fields })
    }

    /// `{index, name}` for every observation, in trace order.
    pub fn observation_refs(&self) -> Vec<ObservationRef> {
        self.observations()
            .enumerate()
            .map(|(index, obs)| ObservationRef {
                index,
                name: obs.name().map(str::to_string),
            })
            .collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.payload)
    }

    fn observation_values(&self) -> &[Value] {
        self.payload
            .get("observations")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

impl Serialize for Trace {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Trace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(payload) => {
                check_observations(&payload).map_err(D::Error::custom)?;
                Ok(Self { payload })
            }
            other => Err(D::Error::custom(format!(
                "expected a JSON object, found {}",
                json_type(&other)
            ))),
        }
    }
}

fn check_observations(payload: &Map<String, Value>) -> std::result::Result<(), String> {
    match payload.get("observations") {
        None => Err("missing `observations` sequence".to_string()),
        Some(Value::Array(items)) => match items.iter().position(|item| !item.is_object()) {
            Some(pos) => Err(format!(
                "observation {} is {}, expected an object",
                pos,
                json_type(&items[pos])
            )),
            None => Ok(()),
        },
        Some(other) => Err(format!(
            "`observations` must be an array, found {}",
            json_type(other)
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// One recorded step within a trace (span, generation or event), borrowed
/// from the trace payload.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Observation<'a> {
    /// `None` when absent, null or not a string
    pub fn name(&self) -> Option<&'a str> {
        self.str_field("name")
    }

    pub fn id(&self) -> Option<&'a str> {
        self.str_field("id")
    }

    /// Observation type (`SPAN`, `GENERATION`, `EVENT`)
    pub fn kind(&self) -> Option<&'a str> {
        self.str_field("type")
    }

    pub fn model(&self) -> Option<&'a str> {
        self.str_field("model")
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.fields.get("startTime").and_then(parse_timestamp)
    }

    /// Null when the backend recorded no input
    pub fn input(&self) -> &'a Value {
        self.fields.get("input").unwrap_or(&NULL)
    }

    pub fn output(&self) -> &'a Value {
        self.fields.get("output").unwrap_or(&NULL)
    }

    pub fn fields(&self) -> &'a Map<String, Value> {
        self.fields
    }

    fn str_field(&self, key: &str) -> Option<&'a str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Position and name of an observation, without its payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRef {
    pub index: usize,
    pub name: Option<String>,
}

// ============================================================================
// REQUEST
// ============================================================================

/// Narrows a trace request down to specific observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// Position in the trace's observation sequence
    Index(i64),
    /// Exact, case-sensitive observation name
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRequest {
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
    /// Bypass the cache and re-fetch from the backend
    #[serde(default)]
    pub refresh: bool,
}

impl TraceRequest {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            selector: None,
            refresh: false,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Build a request from separate index and name parameters.
    ///
    /// When both are given the index wins and the name is ignored.
    pub fn from_parts(
        trace_id: impl Into<String>,
        index: Option<i64>,
        name: Option<String>,
    ) -> Self {
        let trace_id = trace_id.into();
        let selector = match (index, name) {
            (Some(index), Some(name)) => {
                tracing::debug!(
                    trace_id = %trace_id,
                    index,
                    ignored_name = %name,
                    "Both index and name given, using index"
                );
                Some(Selector::Index(index))
            }
            (Some(index), None) => Some(Selector::Index(index)),
            (None, Some(name)) => Some(Selector::Name(name)),
            (None, None) => None,
        };
        Self {
            trace_id,
            selector,
            refresh: false,
        }
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Everything a "get trace" request can answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceView {
    FullPayload {
        trace: Trace,
    },
    StructuralSummary {
        size_bytes: usize,
        threshold_bytes: usize,
        observations: Vec<ObservationRef>,
        hint: String,
    },
    SingleObservation {
        input: Value,
        output: Value,
    },
    AmbiguousMatches {
        matches: Vec<ObservationRef>,
        hint: String,
    },
    NoMatches {},
    IndexOutOfRange {
        valid_range: [i64; 2],
    },
    Error {
        message: String,
    },
}

impl TraceView {
    pub fn is_error(&self) -> bool {
        matches!(self, TraceView::Error { .. })
    }
}
