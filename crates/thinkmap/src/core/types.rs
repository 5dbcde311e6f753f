//! Core type definitions shared across the kernel
//!
//! Diagram types, UI language, and the small geometry records carried in
//! a spec's metadata maps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::EditorError;

/// The ten supported thinking-map shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    BubbleMap,
    CircleMap,
    #[serde(rename = "mindmap", alias = "mind_map")]
    MindMap,
    TreeMap,
    BraceMap,
    BridgeMap,
    DoubleBubbleMap,
    FlowMap,
    MultiFlowMap,
    ConceptMap,
}

impl DiagramType {
    /// Every supported type, in menu order
    pub const ALL: [DiagramType; 10] = [
        DiagramType::CircleMap,
        DiagramType::BubbleMap,
        DiagramType::DoubleBubbleMap,
        DiagramType::TreeMap,
        DiagramType::BraceMap,
        DiagramType::FlowMap,
        DiagramType::MultiFlowMap,
        DiagramType::BridgeMap,
        DiagramType::MindMap,
        DiagramType::ConceptMap,
    ];

    /// Canonical wire name (`mindmap`, not `mind_map`)
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramType::BubbleMap => "bubble_map",
            DiagramType::CircleMap => "circle_map",
            DiagramType::MindMap => "mindmap",
            DiagramType::TreeMap => "tree_map",
            DiagramType::BraceMap => "brace_map",
            DiagramType::BridgeMap => "bridge_map",
            DiagramType::DoubleBubbleMap => "double_bubble_map",
            DiagramType::FlowMap => "flow_map",
            DiagramType::MultiFlowMap => "multi_flow_map",
            DiagramType::ConceptMap => "concept_map",
        }
    }

    /// Human-readable name for menus and CLI listings
    pub fn display_name(&self) -> &'static str {
        match self {
            DiagramType::BubbleMap => "Bubble Map",
            DiagramType::CircleMap => "Circle Map",
            DiagramType::MindMap => "Mind Map",
            DiagramType::TreeMap => "Tree Map",
            DiagramType::BraceMap => "Brace Map",
            DiagramType::BridgeMap => "Bridge Map",
            DiagramType::DoubleBubbleMap => "Double Bubble Map",
            DiagramType::FlowMap => "Flow Map",
            DiagramType::MultiFlowMap => "Multi-Flow Map",
            DiagramType::ConceptMap => "Concept Map",
        }
    }

    /// Fields a well-formed spec of this type must carry
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            DiagramType::BubbleMap => &["topic", "attributes"],
            DiagramType::CircleMap => &["topic", "context"],
            DiagramType::MindMap | DiagramType::TreeMap => &["topic", "children"],
            DiagramType::BraceMap => &["whole", "parts"],
            DiagramType::BridgeMap => &["analogies"],
            DiagramType::DoubleBubbleMap => &[
                "left",
                "right",
                "similarities",
                "left_differences",
                "right_differences",
            ],
            DiagramType::FlowMap => &["title", "steps"],
            DiagramType::MultiFlowMap => &["event", "causes", "effects"],
            DiagramType::ConceptMap => &["nodes", "connections"],
        }
    }

    /// Normalise a wire name, mapping `mind_map` to `mindmap`
    pub fn normalize_name(name: &str) -> String {
        if name == "mind_map" {
            "mindmap".to_string()
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramType {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bubble_map" => Ok(DiagramType::BubbleMap),
            "circle_map" => Ok(DiagramType::CircleMap),
            "mindmap" | "mind_map" => Ok(DiagramType::MindMap),
            "tree_map" => Ok(DiagramType::TreeMap),
            "brace_map" => Ok(DiagramType::BraceMap),
            "bridge_map" => Ok(DiagramType::BridgeMap),
            "double_bubble_map" => Ok(DiagramType::DoubleBubbleMap),
            "flow_map" => Ok(DiagramType::FlowMap),
            "multi_flow_map" => Ok(DiagramType::MultiFlowMap),
            "concept_map" => Ok(DiagramType::ConceptMap),
            other => Err(EditorError::UnknownDiagramType {
                diagram_type: other.to_string(),
            }),
        }
    }
}

/// UI language; drives placeholders and user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Pick the string for this language
    pub fn pick<'a>(&self, zh: &'a str, en: &'a str) -> &'a str {
        match self {
            Language::Zh => zh,
            Language::En => en,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }
}

impl FromStr for Language {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "zh-cn" | "chinese" => Ok(Language::Zh),
            other => Err(EditorError::config(format!("Unknown language: {}", other))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form placement override for a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Preserved footprint of a node whose text was emptied
///
/// Serialises as `{w,h}`, `{r}` or `{w,h,r}` depending on which values exist.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDimensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
}

impl NodeDimensions {
    pub fn is_empty(&self) -> bool {
        self.w.is_none() && self.h.is_none() && self.r.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_type_round_trip_names() {
        for diagram_type in DiagramType::ALL {
            let parsed: DiagramType = diagram_type.as_str().parse().unwrap();
            assert_eq!(parsed, diagram_type);
        }
    }

    #[test]
    fn test_mind_map_alias() {
        assert_eq!("mind_map".parse::<DiagramType>().unwrap(), DiagramType::MindMap);
        assert_eq!(DiagramType::MindMap.as_str(), "mindmap");
        assert_eq!(DiagramType::normalize_name("mind_map"), "mindmap");
        assert_eq!(DiagramType::normalize_name("tree_map"), "tree_map");
    }

    #[test]
    fn test_unknown_diagram_type() {
        let err = "venn_diagram".parse::<DiagramType>().unwrap_err();
        assert!(format!("{}", err).contains("venn_diagram"));
    }

    #[test]
    fn test_diagram_type_serde() {
        let json = serde_json::to_string(&DiagramType::DoubleBubbleMap).unwrap();
        assert_eq!(json, "\"double_bubble_map\"");
        let parsed: DiagramType = serde_json::from_str("\"mind_map\"").unwrap();
        assert_eq!(parsed, DiagramType::MindMap);
    }

    #[test]
    fn test_language_pick() {
        assert_eq!(Language::Zh.pick("新属性", "New Attribute"), "新属性");
        assert_eq!(Language::En.pick("新属性", "New Attribute"), "New Attribute");
        assert_eq!("ZH".parse::<Language>().unwrap(), Language::Zh);
    }

    #[test]
    fn test_dimensions_serialize_shape() {
        let dims = NodeDimensions {
            w: None,
            h: None,
            r: Some(40.0),
        };
        assert_eq!(serde_json::to_string(&dims).unwrap(), r#"{"r":40.0}"#);
    }
}
