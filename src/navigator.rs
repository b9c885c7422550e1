//! Observation Navigator
//!
//! Resolves a selector against a fetched trace. Everything that isn't a
//! single observation comes back as structured guidance (valid range, list of
//! candidate indices) rather than an error, so the caller can refine the next
//! request.

use serde_json::Value;

use crate::types::{ObservationRef, Selector, Trace, TraceView};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Only the payloads; other observation fields are dropped
    Single { input: Value, output: Value },
    /// Every match, in trace order
    Ambiguous(Vec<ObservationRef>),
    NoMatches,
    /// Inclusive valid range; `[0, -1]` for a trace without observations
    IndexOutOfRange { min: i64, max: i64 },
}

pub fn resolve(trace: &Trace, selector: &Selector) -> Resolution {
    match selector {
        Selector::Index(index) => resolve_index(trace, *index),
        Selector::Name(name) => resolve_name(trace, name),
    }
}

fn resolve_index(trace: &Trace, index: i64) -> Resolution {
    let count = trace.observation_count();
    match usize::try_from(index).ok().and_then(|i| trace.observation(i)) {
        Some(obs) => Resolution::Single {
            input: obs.input().clone(),
            output: obs.output().clone(),
        },
        None => Resolution::IndexOutOfRange {
            min: 0,
            max: count as i64 - 1,
        },
    }
}

fn resolve_name(trace: &Trace, name: &str) -> Resolution {
    let matches: Vec<_> = trace
        .observations()
        .enumerate()
        .filter(|(_, obs)| obs.name() == Some(name))
        .collect();

    match matches.as_slice() {
        [] => Resolution::NoMatches,
        [(_, obs)] => Resolution::Single {
            input: obs.input().clone(),
            output: obs.output().clone(),
        },
        many => Resolution::Ambiguous(
            many.iter()
                .map(|(index, obs)| ObservationRef {
                    index: *index,
                    name: obs.name().map(str::to_string),
                })
                .collect(),
        ),
    }
}

impl From<Resolution> for TraceView {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Single { input, output } => TraceView::SingleObservation { input, output },
            Resolution::Ambiguous(matches) => TraceView::AmbiguousMatches {
                hint: format!(
                    "{} observations share this name; request one of them by index",
                    matches.len()
                ),
                matches,
            },
            Resolution::NoMatches => TraceView::NoMatches {},
            Resolution::IndexOutOfRange { min, max } => TraceView::IndexOutOfRange {
                valid_range: [min, max],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::trace_with;
    use serde_json::json;

    fn t1() -> Trace {
        trace_with("t1", &["parse", "exec", "parse"])
    }

    #[test]
    fn test_index_in_range() {
        let trace = t1();
        for i in 0..3 {
            assert_eq!(
                resolve(&trace, &Selector::Index(i)),
                Resolution::Single {
                    input: json!({"step": i}),
                    output: json!(format!("out-{i}")),
                }
            );
        }
    }

    #[test]
    fn test_index_out_of_range() {
        let trace = t1();
        for i in [3, 5, -1, i64::MIN, i64::MAX] {
            assert_eq!(
                resolve(&trace, &Selector::Index(i)),
                Resolution::IndexOutOfRange { min: 0, max: 2 }
            );
        }
    }

    #[test]
    fn test_index_on_empty_trace() {
        let trace = trace_with("empty", &[]);
        assert_eq!(
            resolve(&trace, &Selector::Index(0)),
            Resolution::IndexOutOfRange { min: 0, max: -1 }
        );
    }

    #[test]
    fn test_unique_name() {
        assert_eq!(
            resolve(&t1(), &Selector::Name("exec".to_string())),
            Resolution::Single {
                input: json!({"step": 1}),
                output: json!("out-1"),
            }
        );
    }

    #[test]
    fn test_duplicate_name_lists_all_in_order() {
        let resolution = resolve(&t1(), &Selector::Name("parse".to_string()));
        assert_eq!(
            resolution,
            Resolution::Ambiguous(vec![
                ObservationRef {
                    index: 0,
                    name: Some("parse".to_string())
                },
                ObservationRef {
                    index: 2,
                    name: Some("parse".to_string())
                },
            ])
        );
    }

    #[test]
    fn test_name_match_is_exact() {
        let trace = t1();
        for name in ["Parse", "pars", "parse ", ""] {
            assert_eq!(
                resolve(&trace, &Selector::Name(name.to_string())),
                Resolution::NoMatches
            );
        }
    }

    #[test]
    fn test_unnamed_observations_never_match() {
        let trace = Trace::from_value(
            "t2",
            json!({"id": "t2", "observations": [{"input": 1}, {"name": null, "input": 2}, {"name": 0}]}),
        )
        .unwrap();
        assert_eq!(
            resolve(&trace, &Selector::Name(String::new())),
            Resolution::NoMatches
        );
    }

    #[test]
    fn test_into_view() {
        let view: TraceView = resolve(&t1(), &Selector::Index(9)).into();
        assert_eq!(view, TraceView::IndexOutOfRange { valid_range: [0, 2] });

        let view: TraceView = resolve(&t1(), &Selector::Name("parse".to_string())).into();
        match view {
            TraceView::AmbiguousMatches { matches, hint } => {
                assert_eq!(matches.len(), 2);
                assert!(hint.contains("by index"));
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }
}
