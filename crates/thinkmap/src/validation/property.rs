//! Schema check of a candidate spec (usually an LLM result) against its type

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::DiagramType;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub missing_fields: Vec<String>,
    pub invalid_fields: Vec<String>,
}

impl PropertyValidation {
    fn finish(mut self) -> Self {
        self.is_valid = self.issues.is_empty()
            && self.missing_fields.is_empty()
            && self.invalid_fields.is_empty();
        self
    }

    /// Every problem as one human-readable list
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = self
            .missing_fields
            .iter()
            .map(|f| format!("missing field '{}'", f))
            .collect();
        problems.extend(self.invalid_fields.iter().map(|f| format!("'{}' must be an array", f)));
        problems.extend(self.issues.iter().cloned());
        problems
    }
}

struct Requirements {
    scalars: &'static [&'static str],
    arrays: &'static [&'static str],
    /// Must be arrays when present; may be empty
    optional_arrays: &'static [&'static str],
}

fn requirements(diagram_type: DiagramType) -> Requirements {
    type Fields = &'static [&'static str];
    let (scalars, arrays, optional_arrays): (Fields, Fields, Fields) = match diagram_type {
        DiagramType::BubbleMap => (&["topic"], &["attributes"], &[]),
        DiagramType::CircleMap => (&["topic"], &["context"], &[]),
        DiagramType::MindMap | DiagramType::TreeMap => (&["topic"], &["children"], &[]),
        DiagramType::BraceMap => (&["whole"], &["parts"], &[]),
        DiagramType::BridgeMap => (&[], &["analogies"], &[]),
        DiagramType::DoubleBubbleMap => (
            &["left", "right"],
            &["similarities", "left_differences", "right_differences"],
            &[],
        ),
        DiagramType::FlowMap => (&["title"], &["steps"], &[]),
        DiagramType::MultiFlowMap => (&["event"], &["causes", "effects"], &[]),
        DiagramType::ConceptMap => (&[], &["nodes"], &["connections"]),
    };
    Requirements {
        scalars,
        arrays,
        optional_arrays,
    }
}

/// Falsy in the sense the generation backend uses: absent, null, false, 0 or ""
fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Validate `spec` against the wire type name (`mind_map` accepted)
pub fn validate_properties(diagram_type: &str, spec: &Value) -> PropertyValidation {
    let mut result = PropertyValidation::default();

    let normalized = DiagramType::normalize_name(diagram_type);
    let Ok(diagram_type) = normalized.parse::<DiagramType>() else {
        result
            .issues
            .push(format!("Unknown diagram type: {}", normalized));
        return result.finish();
    };
    let Value::Object(object) = spec else {
        result.issues.push("Spec must be a JSON object".to_string());
        return result.finish();
    };

    let req = requirements(diagram_type);
    for field in req.scalars {
        if is_falsy(object.get(*field)) {
            result.missing_fields.push(field.to_string());
        }
    }
    for field in req.arrays {
        match object.get(*field) {
            Some(Value::Array(items)) if items.is_empty() => {
                result.issues.push(format!("'{}' is empty", field));
            }
            Some(Value::Array(_)) => {}
            _ => result.invalid_fields.push(field.to_string()),
        }
    }
    for field in req.optional_arrays {
        match object.get(*field) {
            None | Some(Value::Null) | Some(Value::Array(_)) => {}
            Some(_) => result.invalid_fields.push(field.to_string()),
        }
    }

    if diagram_type == DiagramType::BridgeMap {
        if let Some(Value::Array(analogies)) = object.get("analogies") {
            for (i, analogy) in analogies.iter().enumerate() {
                for side in ["left", "right"] {
                    if is_falsy(analogy.get(side)) {
                        result.missing_fields.push(format!("analogies[{}].{}", i, side));
                    }
                }
            }
        }
    }

    let result = result.finish();
    debug!(
        diagram_type = %diagram_type,
        is_valid = result.is_valid,
        missing = result.missing_fields.len(),
        invalid = result.invalid_fields.len(),
        issues = result.issues.len(),
        "Property validation finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_bubble_map() {
        let result = validate_properties("bubble_map", &json!({
            "topic": "Water",
            "attributes": ["wet", "clear"]
        }));
        assert!(result.is_valid);
    }

    #[test]
    fn test_missing_scalar_and_non_array() {
        let result = validate_properties("bubble_map", &json!({ "topic": "", "attributes": "wet" }));
        assert!(!result.is_valid);
        assert_eq!(result.missing_fields, vec!["topic"]);
        assert_eq!(result.invalid_fields, vec!["attributes"]);
    }

    #[test]
    fn test_empty_array_is_an_issue() {
        let result = validate_properties("flow_map", &json!({ "title": "Rain", "steps": [] }));
        assert!(!result.is_valid);
        assert!(result.missing_fields.is_empty());
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_bridge_map_pairs() {
        let result = validate_properties("bridge_map", &json!({
            "analogies": [
                { "left": "Bird", "right": "Nest" },
                { "left": "Bee", "right": "" }
            ]
        }));
        assert!(!result.is_valid);
        assert_eq!(result.missing_fields, vec!["analogies[1].right"]);
    }

    #[test]
    fn test_mind_map_alias() {
        let spec = json!({ "topic": "Plants", "children": [{ "label": "Roots" }] });
        assert!(validate_properties("mind_map", &spec).is_valid);
        assert!(validate_properties("mindmap", &spec).is_valid);
    }

    #[test]
    fn test_unknown_type() {
        let result = validate_properties("venn", &json!({}));
        assert!(!result.is_valid);
        assert!(result.issues[0].contains("venn"));
    }

    #[test]
    fn test_concept_map_connections_optional() {
        let spec = json!({ "nodes": [{ "id": "a", "text": "Plant" }] });
        assert!(validate_properties("concept_map", &spec).is_valid);
        let bad = json!({ "nodes": [{ "id": "a" }], "connections": "a->b" });
        assert_eq!(
            validate_properties("concept_map", &bad).invalid_fields,
            vec!["connections"]
        );
    }
}
