//! Cross-model consistency analysis of one fan-out
//!
//! Models differ in verbosity, so a spread in array sizes is informational.
//! A model whose spec failed property validation is worth a warning.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::property::PropertyValidation;

/// Structural arrays whose sizes are compared across models
pub const COUNTED_ARRAYS: [&str; 6] =
    ["children", "nodes", "categories", "parts", "analogies", "steps"];

/// Spread above which array sizes are reported
pub const COUNT_VARIANCE_THRESHOLD: usize = 2;

/// Shape of one model's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub diagram_type: Option<String>,
    pub keys: Vec<String>,
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    ContentCountVariance {
        field: String,
        min: usize,
        max: usize,
        counts: BTreeMap<String, usize>,
    },
    ValidationFailures {
        models: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub inconsistencies: Vec<Inconsistency>,
    pub summaries: Vec<ModelSummary>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.inconsistencies.is_empty()
    }

    /// True when some model failed validation
    pub fn has_warnings(&self) -> bool {
        self.inconsistencies
            .iter()
            .any(|i| matches!(i, Inconsistency::ValidationFailures { .. }))
    }
}

/// One successful model result, as fed to [`analyze_consistency`]
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec<'a> {
    pub model: &'a str,
    pub diagram_type: Option<&'a str>,
    pub spec: &'a Value,
    pub validation: Option<&'a PropertyValidation>,
}

pub fn summarize(model: &str, diagram_type: Option<&str>, spec: &Value) -> ModelSummary {
    let (keys, counts) = match spec {
        Value::Object(object) => {
            let mut keys: Vec<String> = object.keys().cloned().collect();
            keys.sort();
            let counts = COUNTED_ARRAYS
                .iter()
                .filter_map(|field| match object.get(*field) {
                    Some(Value::Array(items)) => Some((field.to_string(), items.len())),
                    _ => None,
                })
                .collect();
            (keys, counts)
        }
        _ => (Vec::new(), BTreeMap::new()),
    };
    ModelSummary {
        model: model.to_string(),
        diagram_type: diagram_type.map(str::to_string),
        keys,
        counts,
    }
}

pub fn analyze_consistency(results: &[ModelSpec<'_>]) -> ConsistencyReport {
    let summaries: Vec<ModelSummary> = results
        .iter()
        .map(|r| summarize(r.model, r.diagram_type, r.spec))
        .collect();

    let mut inconsistencies = Vec::new();

    let fields: BTreeSet<&String> = summaries.iter().flat_map(|s| s.counts.keys()).collect();
    for field in fields {
        let counts: BTreeMap<String, usize> = summaries
            .iter()
            .filter_map(|s| s.counts.get(field).map(|c| (s.model.clone(), *c)))
            .collect();
        if counts.len() < 2 {
            continue;
        }
        let min = counts.values().copied().min().unwrap_or(0);
        let max = counts.values().copied().max().unwrap_or(0);
        if max - min > COUNT_VARIANCE_THRESHOLD {
            info!(field = %field, min, max, "Models disagree on content count");
            inconsistencies.push(Inconsistency::ContentCountVariance {
                field: field.clone(),
                min,
                max,
                counts,
            });
        }
    }

    let failed: Vec<String> = results
        .iter()
        .filter(|r| r.validation.map(|v| !v.is_valid).unwrap_or(false))
        .map(|r| r.model.to_string())
        .collect();
    if !failed.is_empty() {
        warn!(models = ?failed, "Model results failed property validation");
        inconsistencies.push(Inconsistency::ValidationFailures { models: failed });
    }

    ConsistencyReport {
        inconsistencies,
        summaries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invalid() -> PropertyValidation {
        PropertyValidation {
            is_valid: false,
            missing_fields: vec!["topic".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_count_variance_above_threshold() {
        let a = json!({ "topic": "T", "children": [1, 2] });
        let b = json!({ "topic": "T", "children": [1, 2, 3, 4, 5] });
        let report = analyze_consistency(&[
            ModelSpec { model: "qwen", diagram_type: Some("mindmap"), spec: &a, validation: None },
            ModelSpec { model: "kimi", diagram_type: Some("mindmap"), spec: &b, validation: None },
        ]);
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.inconsistencies.len(), 1);
        match &report.inconsistencies[0] {
            Inconsistency::ContentCountVariance { field, min, max, .. } => {
                assert_eq!(field, "children");
                assert_eq!((*min, *max), (2, 5));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_spread_of_two_is_fine() {
        let a = json!({ "steps": [1] });
        let b = json!({ "steps": [1, 2, 3] });
        let report = analyze_consistency(&[
            ModelSpec { model: "qwen", diagram_type: None, spec: &a, validation: None },
            ModelSpec { model: "kimi", diagram_type: None, spec: &b, validation: None },
        ]);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_validation_failures_listed() {
        let spec = json!({ "children": [] });
        let bad = invalid();
        let report = analyze_consistency(&[ModelSpec {
            model: "doubao",
            diagram_type: Some("mindmap"),
            spec: &spec,
            validation: Some(&bad),
        }]);
        assert!(report.has_warnings());
        assert_eq!(
            report.inconsistencies,
            vec![Inconsistency::ValidationFailures {
                models: vec!["doubao".into()]
            }]
        );
    }

    #[test]
    fn test_summary_keys_and_counts() {
        let spec = json!({ "whole": "Car", "parts": [1, 2] });
        let summary = summarize("qwen", Some("brace_map"), &spec);
        assert_eq!(summary.keys, vec!["parts", "whole"]);
        assert_eq!(summary.counts["parts"], 2);
        assert!(!summary.counts.contains_key("children"));
    }
}
