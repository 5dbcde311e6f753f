//! Diagram specification: the in-memory document behind one diagram
//!
//! A [`DiagramSpec`] is a tagged variant over [`DiagramType`] plus two
//! metadata maps shared by every shape. The JSON wire shape carries no type
//! tag; the type travels beside the spec, so decoding goes through
//! [`DiagramSpec::from_value`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::error::EditorError;
use super::types::{DiagramType, NodeDimensions, Position};

/// Wire key for the preserved-dimension map
pub const NODE_DIMENSIONS_KEY: &str = "_node_dimensions";

/// Wire key for the custom-position map
pub const CUSTOM_POSITIONS_KEY: &str = "_customPositions";

/// An element of a text-bearing array inside a spec
pub trait TextItem {
    /// Build a fresh element carrying placeholder text
    fn placeholder(text: &str) -> Self;
    fn text(&self) -> &str;
    fn set_text(&mut self, text: String);
}

impl TextItem for String {
    fn placeholder(text: &str) -> Self {
        text.to_string()
    }

    fn text(&self) -> &str {
        self
    }

    fn set_text(&mut self, text: String) {
        *self = text;
    }
}

/// Object-safe view over `Vec<T: TextItem>`
pub trait TextList {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn text_at(&self, index: usize) -> Option<&str>;
    fn set_text_at(&mut self, index: usize, text: String) -> bool;
    fn push_placeholder(&mut self, text: &str);
    fn remove_at(&mut self, index: usize) -> bool;
}

impl<T: TextItem> TextList for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn text_at(&self, index: usize) -> Option<&str> {
        self.get(index).map(TextItem::text)
    }

    fn set_text_at(&mut self, index: usize, text: String) -> bool {
        match self.get_mut(index) {
            Some(item) => {
                item.set_text(text);
                true
            }
            None => false,
        }
    }

    fn push_placeholder(&mut self, text: &str) {
        self.push(T::placeholder(text));
    }

    fn remove_at(&mut self, index: usize) -> bool {
        if index < Vec::len(self) {
            self.remove(index);
            true
        } else {
            false
        }
    }
}

/// Mind-map branch; nested children are branches too
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MindNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "text")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MindNode>,
}

impl TextItem for MindNode {
    fn placeholder(text: &str) -> Self {
        Self {
            label: text.to_string(),
            ..Default::default()
        }
    }

    fn text(&self) -> &str {
        &self.label
    }

    fn set_text(&mut self, text: String) {
        self.label = text;
    }
}

/// Tree-map category or leaf
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "label")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TextItem for TreeNode {
    fn placeholder(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

/// Brace-map part with optional subparts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subparts: Vec<Part>,
}

impl TextItem for Part {
    fn placeholder(text: &str) -> Self {
        Self {
            name: text.to_string(),
            subparts: Vec::new(),
        }
    }

    fn text(&self) -> &str {
        &self.name
    }

    fn set_text(&mut self, text: String) {
        self.name = text;
    }
}

/// One bridge-map pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Analogy {
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub right: String,
}

/// Concept-map node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConceptNode {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "label")]
    pub text: String,
}

impl TextItem for ConceptNode {
    fn placeholder(text: &str) -> Self {
        Self {
            id: String::new(),
            text: text.to_string(),
        }
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

/// Directed, optionally labelled concept-map edge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

macro_rules! shape_struct {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $($(#[$fmeta])* pub $field: $ty,)*
            /// Fields this kernel does not interpret, kept for the renderer
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }
    };
}

shape_struct!(BubbleMapSpec { topic: String, attributes: Vec<String> });
shape_struct!(CircleMapSpec { topic: String, context: Vec<String> });
shape_struct!(MindMapSpec { topic: String, children: Vec<MindNode> });
shape_struct!(TreeMapSpec { topic: String, children: Vec<TreeNode> });
shape_struct!(BraceMapSpec { whole: String, parts: Vec<Part> });
shape_struct!(BridgeMapSpec { analogies: Vec<Analogy> });
shape_struct!(DoubleBubbleMapSpec {
    left: String,
    right: String,
    similarities: Vec<String>,
    left_differences: Vec<String>,
    right_differences: Vec<String>,
});
shape_struct!(FlowMapSpec { title: String, steps: Vec<String> });
shape_struct!(MultiFlowMapSpec { event: String, causes: Vec<String>, effects: Vec<String> });
shape_struct!(ConceptMapSpec { nodes: Vec<ConceptNode>, connections: Vec<Connection> });

/// Per-type payload of a spec
#[derive(Debug, Clone, PartialEq)]
pub enum SpecBody {
    BubbleMap(BubbleMapSpec),
    CircleMap(CircleMapSpec),
    MindMap(MindMapSpec),
    TreeMap(TreeMapSpec),
    BraceMap(BraceMapSpec),
    BridgeMap(BridgeMapSpec),
    DoubleBubbleMap(DoubleBubbleMapSpec),
    FlowMap(FlowMapSpec),
    MultiFlowMap(MultiFlowMapSpec),
    ConceptMap(ConceptMapSpec),
}

impl SpecBody {
    pub fn diagram_type(&self) -> DiagramType {
        match self {
            SpecBody::BubbleMap(_) => DiagramType::BubbleMap,
            SpecBody::CircleMap(_) => DiagramType::CircleMap,
            SpecBody::MindMap(_) => DiagramType::MindMap,
            SpecBody::TreeMap(_) => DiagramType::TreeMap,
            SpecBody::BraceMap(_) => DiagramType::BraceMap,
            SpecBody::BridgeMap(_) => DiagramType::BridgeMap,
            SpecBody::DoubleBubbleMap(_) => DiagramType::DoubleBubbleMap,
            SpecBody::FlowMap(_) => DiagramType::FlowMap,
            SpecBody::MultiFlowMap(_) => DiagramType::MultiFlowMap,
            SpecBody::ConceptMap(_) => DiagramType::ConceptMap,
        }
    }

    /// Scalar root field by wire name (`topic`, `whole`, `title`, `event`, `left`, `right`)
    pub fn root_field(&self, field: &str) -> Option<&str> {
        let value = match (self, field) {
            (SpecBody::BubbleMap(s), "topic") => &s.topic,
            (SpecBody::CircleMap(s), "topic") => &s.topic,
            (SpecBody::MindMap(s), "topic") => &s.topic,
            (SpecBody::TreeMap(s), "topic") => &s.topic,
            (SpecBody::BraceMap(s), "whole") => &s.whole,
            (SpecBody::DoubleBubbleMap(s), "left") => &s.left,
            (SpecBody::DoubleBubbleMap(s), "right") => &s.right,
            (SpecBody::FlowMap(s), "title") => &s.title,
            (SpecBody::MultiFlowMap(s), "event") => &s.event,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn root_field_mut(&mut self, field: &str) -> Option<&mut String> {
        match (self, field) {
            (SpecBody::BubbleMap(s), "topic") => Some(&mut s.topic),
            (SpecBody::CircleMap(s), "topic") => Some(&mut s.topic),
            (SpecBody::MindMap(s), "topic") => Some(&mut s.topic),
            (SpecBody::TreeMap(s), "topic") => Some(&mut s.topic),
            (SpecBody::BraceMap(s), "whole") => Some(&mut s.whole),
            (SpecBody::DoubleBubbleMap(s), "left") => Some(&mut s.left),
            (SpecBody::DoubleBubbleMap(s), "right") => Some(&mut s.right),
            (SpecBody::FlowMap(s), "title") => Some(&mut s.title),
            (SpecBody::MultiFlowMap(s), "event") => Some(&mut s.event),
            _ => None,
        }
    }

    /// Text-bearing array by wire name
    pub fn list(&self, field: &str) -> Option<&dyn TextList> {
        match (self, field) {
            (SpecBody::BubbleMap(s), "attributes") => Some(&s.attributes),
            (SpecBody::CircleMap(s), "context") => Some(&s.context),
            (SpecBody::MindMap(s), "children") => Some(&s.children),
            (SpecBody::TreeMap(s), "children") => Some(&s.children),
            (SpecBody::BraceMap(s), "parts") => Some(&s.parts),
            (SpecBody::DoubleBubbleMap(s), "similarities") => Some(&s.similarities),
            (SpecBody::DoubleBubbleMap(s), "left_differences") => Some(&s.left_differences),
            (SpecBody::DoubleBubbleMap(s), "right_differences") => Some(&s.right_differences),
            (SpecBody::FlowMap(s), "steps") => Some(&s.steps),
            (SpecBody::MultiFlowMap(s), "causes") => Some(&s.causes),
            (SpecBody::MultiFlowMap(s), "effects") => Some(&s.effects),
            (SpecBody::ConceptMap(s), "nodes") => Some(&s.nodes),
            _ => None,
        }
    }

    pub fn list_mut(&mut self, field: &str) -> Option<&mut dyn TextList> {
        match (self, field) {
            (SpecBody::BubbleMap(s), "attributes") => Some(&mut s.attributes),
            (SpecBody::CircleMap(s), "context") => Some(&mut s.context),
            (SpecBody::MindMap(s), "children") => Some(&mut s.children),
            (SpecBody::TreeMap(s), "children") => Some(&mut s.children),
            (SpecBody::BraceMap(s), "parts") => Some(&mut s.parts),
            (SpecBody::DoubleBubbleMap(s), "similarities") => Some(&mut s.similarities),
            (SpecBody::DoubleBubbleMap(s), "left_differences") => Some(&mut s.left_differences),
            (SpecBody::DoubleBubbleMap(s), "right_differences") => {
                Some(&mut s.right_differences)
            }
            (SpecBody::FlowMap(s), "steps") => Some(&mut s.steps),
            (SpecBody::MultiFlowMap(s), "causes") => Some(&mut s.causes),
            (SpecBody::MultiFlowMap(s), "effects") => Some(&mut s.effects),
            (SpecBody::ConceptMap(s), "nodes") => Some(&mut s.nodes),
            _ => None,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            SpecBody::BubbleMap(s) => serde_json::to_value(s),
            SpecBody::CircleMap(s) => serde_json::to_value(s),
            SpecBody::MindMap(s) => serde_json::to_value(s),
            SpecBody::TreeMap(s) => serde_json::to_value(s),
            SpecBody::BraceMap(s) => serde_json::to_value(s),
            SpecBody::BridgeMap(s) => serde_json::to_value(s),
            SpecBody::DoubleBubbleMap(s) => serde_json::to_value(s),
            SpecBody::FlowMap(s) => serde_json::to_value(s),
            SpecBody::MultiFlowMap(s) => serde_json::to_value(s),
            SpecBody::ConceptMap(s) => serde_json::to_value(s),
        }
    }

    fn from_value(diagram_type: DiagramType, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match diagram_type {
            DiagramType::BubbleMap => SpecBody::BubbleMap(serde_json::from_value(value)?),
            DiagramType::CircleMap => SpecBody::CircleMap(serde_json::from_value(value)?),
            DiagramType::MindMap => SpecBody::MindMap(serde_json::from_value(value)?),
            DiagramType::TreeMap => SpecBody::TreeMap(serde_json::from_value(value)?),
            DiagramType::BraceMap => SpecBody::BraceMap(serde_json::from_value(value)?),
            DiagramType::BridgeMap => SpecBody::BridgeMap(serde_json::from_value(value)?),
            DiagramType::DoubleBubbleMap => {
                SpecBody::DoubleBubbleMap(serde_json::from_value(value)?)
            }
            DiagramType::FlowMap => SpecBody::FlowMap(serde_json::from_value(value)?),
            DiagramType::MultiFlowMap => SpecBody::MultiFlowMap(serde_json::from_value(value)?),
            DiagramType::ConceptMap => SpecBody::ConceptMap(serde_json::from_value(value)?),
        })
    }
}

/// A diagram specification
///
/// `Clone` is a deep copy: snapshots taken with `clone()` never share state
/// with the live spec.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramSpec {
    pub body: SpecBody,
    /// Node key (`topic`, `attribute-3`) → preserved footprint
    pub node_dimensions: BTreeMap<String, NodeDimensions>,
    /// Node id → user-placed position
    pub custom_positions: BTreeMap<String, Position>,
}

impl DiagramSpec {
    pub fn new(body: SpecBody) -> Self {
        Self {
            body,
            node_dimensions: BTreeMap::new(),
            custom_positions: BTreeMap::new(),
        }
    }

    pub fn diagram_type(&self) -> DiagramType {
        self.body.diagram_type()
    }

    /// Decode the wire shape of a spec of the given type
    pub fn from_value(diagram_type: DiagramType, value: Value) -> Result<Self, EditorError> {
        let Value::Object(mut object) = value else {
            return Err(EditorError::invalid_spec(
                diagram_type.as_str(),
                "spec must be a JSON object",
            ));
        };

        let node_dimensions = match object.remove(NODE_DIMENSIONS_KEY) {
            Some(Value::Null) | None => BTreeMap::new(),
            Some(raw) => serde_json::from_value(raw).map_err(|e| {
                EditorError::invalid_spec(diagram_type.as_str(), format!("{NODE_DIMENSIONS_KEY}: {e}"))
            })?,
        };
        let custom_positions = match object.remove(CUSTOM_POSITIONS_KEY) {
            Some(Value::Null) | None => BTreeMap::new(),
            Some(raw) => serde_json::from_value(raw).map_err(|e| {
                EditorError::invalid_spec(diagram_type.as_str(), format!("{CUSTOM_POSITIONS_KEY}: {e}"))
            })?,
        };

        let body = SpecBody::from_value(diagram_type, Value::Object(object))
            .map_err(|e| EditorError::invalid_spec(diagram_type.as_str(), e.to_string()))?;

        Ok(Self {
            body,
            node_dimensions,
            custom_positions,
        })
    }

    /// Encode to the wire shape; empty metadata maps are omitted
    pub fn to_value(&self) -> Value {
        let mut value = self
            .body
            .to_value()
            .unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(object) = &mut value {
            if !self.node_dimensions.is_empty() {
                object.insert(
                    NODE_DIMENSIONS_KEY.to_string(),
                    serde_json::to_value(&self.node_dimensions).unwrap_or(Value::Null),
                );
            }
            if !self.custom_positions.is_empty() {
                object.insert(
                    CUSTOM_POSITIONS_KEY.to_string(),
                    serde_json::to_value(&self.custom_positions).unwrap_or(Value::Null),
                );
            }
        }
        value
    }
}

impl Serialize for DiagramSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_bubble_map_with_metadata() {
        let value = json!({
            "topic": "T",
            "attributes": ["A", "B"],
            "_node_dimensions": { "topic": { "w": 120.0, "h": 40.0 } },
            "_customPositions": { "n1": { "x": 10.0, "y": 20.0 } }
        });
        let spec = DiagramSpec::from_value(DiagramType::BubbleMap, value).unwrap();
        assert_eq!(spec.diagram_type(), DiagramType::BubbleMap);
        assert_eq!(spec.body.root_field("topic"), Some("T"));
        assert_eq!(spec.body.list("attributes").unwrap().len(), 2);
        assert_eq!(spec.node_dimensions["topic"].w, Some(120.0));
        assert_eq!(spec.custom_positions["n1"], Position::new(10.0, 20.0));
    }

    #[test]
    fn test_encode_round_trip_keeps_extra_fields() {
        let value = json!({
            "whole": "Car",
            "parts": [{ "name": "Engine", "subparts": [{ "name": "Piston" }] }],
            "dimension": "Physical parts"
        });
        let spec = DiagramSpec::from_value(DiagramType::BraceMap, value.clone()).unwrap();
        assert_eq!(spec.to_value(), value);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = DiagramSpec::from_value(DiagramType::FlowMap, json!(["a"])).unwrap_err();
        assert!(matches!(err, EditorError::InvalidSpec { .. }));
    }

    #[test]
    fn test_mind_node_accepts_text_alias() {
        let value = json!({ "topic": "Plants", "children": [{ "text": "Roots" }] });
        let spec = DiagramSpec::from_value(DiagramType::MindMap, value).unwrap();
        assert_eq!(spec.body.list("children").unwrap().text_at(0), Some("Roots"));
    }

    #[test]
    fn test_list_mut_push_and_remove() {
        let mut body = SpecBody::MultiFlowMap(MultiFlowMapSpec {
            event: "Rain".into(),
            causes: vec!["Clouds".into()],
            ..Default::default()
        });
        let causes = body.list_mut("causes").unwrap();
        causes.push_placeholder("New Cause");
        assert_eq!(causes.len(), 2);
        assert!(causes.remove_at(0));
        assert!(!causes.remove_at(5));
        assert_eq!(body.list("causes").unwrap().text_at(0), Some("New Cause"));
        assert!(body.list("steps").is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut spec = DiagramSpec::new(SpecBody::CircleMap(CircleMapSpec {
            topic: "X".into(),
            context: vec!["a".into()],
            ..Default::default()
        }));
        let snapshot = spec.clone();
        spec.body.list_mut("context").unwrap().push_placeholder("b");
        assert_eq!(snapshot.body.list("context").unwrap().len(), 1);
    }
}
