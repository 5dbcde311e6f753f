//! Kernel ↔ renderer contract
//!
//! The renderer tags every text/shape element with `data-*` attributes. The
//! kernel never touches the DOM directly; it goes through
//! [`RenderedDocument`], which a browser host implements over the real
//! document and which [`NodeIndex`] implements in memory.

use std::collections::HashMap;

use super::types::NodeDimensions;

/// Attribute names of the contract
pub mod attrs {
    pub const NODE_ID: &str = "data-node-id";
    pub const NODE_TYPE: &str = "data-node-type";
    pub const ARRAY_INDEX: &str = "data-array-index";
    pub const PRESERVED_WIDTH: &str = "data-preserved-width";
    pub const PRESERVED_HEIGHT: &str = "data-preserved-height";
    pub const PRESERVED_RADIUS: &str = "data-preserved-radius";
}

/// One rendered element as seen through its contract attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedNode {
    pub node_id: String,
    pub node_type: String,
    pub array_index: Option<usize>,
    /// Text runs in document order (one per rendered line)
    pub text_runs: Vec<String>,
    pub preserved: NodeDimensions,
}

impl RenderedNode {
    pub fn new(node_id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.array_index = Some(index);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_runs = text.into().lines().map(str::to_string).collect();
        self
    }

    pub fn with_preserved(mut self, preserved: NodeDimensions) -> Self {
        self.preserved = preserved;
        self
    }

    /// Build from raw attributes; `None` without a `data-node-id`
    pub fn from_attributes(attributes: &HashMap<String, String>, text_runs: Vec<String>) -> Option<Self> {
        let node_id = attributes.get(attrs::NODE_ID)?.clone();
        let parse_f64 = |name: &str| attributes.get(name).and_then(|v| v.trim().parse::<f64>().ok());
        Some(Self {
            node_id,
            node_type: attributes.get(attrs::NODE_TYPE).cloned().unwrap_or_default(),
            array_index: attributes
                .get(attrs::ARRAY_INDEX)
                .and_then(|v| v.trim().parse::<usize>().ok()),
            text_runs,
            preserved: NodeDimensions {
                w: parse_f64(attrs::PRESERVED_WIDTH),
                h: parse_f64(attrs::PRESERVED_HEIGHT),
                r: parse_f64(attrs::PRESERVED_RADIUS),
            },
        })
    }

    /// Visible text: trimmed non-empty runs joined by newlines
    pub fn text(&self) -> String {
        self.text_runs
            .iter()
            .map(|run| run.trim())
            .filter(|run| !run.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_preserved_dimensions(&self) -> bool {
        !self.preserved.is_empty()
    }
}

/// Read access to the rendered diagram
pub trait RenderedDocument {
    /// Resolve an element by its `data-node-id`
    fn find_node(&self, node_id: &str) -> Option<RenderedNode>;

    /// Every text element carrying a `data-node-id`, in document order
    fn text_nodes(&self) -> Vec<RenderedNode>;
}

/// In-memory [`RenderedDocument`]
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    nodes: Vec<RenderedNode>,
}

impl NodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by node id, keeping document order
    pub fn insert(&mut self, node: RenderedNode) {
        match self.nodes.iter_mut().find(|n| n.node_id == node.node_id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
    }

    pub fn with_node(mut self, node: RenderedNode) -> Self {
        self.insert(node);
        self
    }

    pub fn remove(&mut self, node_id: &str) -> Option<RenderedNode> {
        let position = self.nodes.iter().position(|n| n.node_id == node_id)?;
        Some(self.nodes.remove(position))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl RenderedDocument for NodeIndex {
    fn find_node(&self, node_id: &str) -> Option<RenderedNode> {
        self.nodes.iter().find(|n| n.node_id == node_id).cloned()
    }

    fn text_nodes(&self) -> Vec<RenderedNode> {
        self.nodes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_attributes() {
        let attributes: HashMap<String, String> = [
            (attrs::NODE_ID, "n1"),
            (attrs::NODE_TYPE, "attribute"),
            (attrs::ARRAY_INDEX, "2"),
            (attrs::PRESERVED_WIDTH, "120.5"),
            (attrs::PRESERVED_HEIGHT, "40"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let node = RenderedNode::from_attributes(&attributes, vec!["Warm".into()]).unwrap();
        assert_eq!(node.node_type, "attribute");
        assert_eq!(node.array_index, Some(2));
        assert_eq!(node.preserved.w, Some(120.5));
        assert_eq!(node.preserved.h, Some(40.0));
        assert_eq!(node.preserved.r, None);
    }

    #[test]
    fn test_from_attributes_requires_id() {
        assert!(RenderedNode::from_attributes(&HashMap::new(), Vec::new()).is_none());
    }

    #[test]
    fn test_multiline_text() {
        let node = RenderedNode {
            text_runs: vec!["  Water ".into(), "".into(), "cycle".into()],
            ..Default::default()
        };
        assert_eq!(node.text(), "Water\ncycle");
    }

    #[test]
    fn test_node_index_insert_replaces() {
        let mut index = NodeIndex::new()
            .with_node(RenderedNode::new("a", "topic").with_text("A"))
            .with_node(RenderedNode::new("b", "attribute").with_index(0));
        index.insert(RenderedNode::new("a", "topic").with_text("A2"));
        assert_eq!(index.len(), 2);
        assert_eq!(index.find_node("a").unwrap().text(), "A2");
        assert!(index.remove("b").is_some());
        assert!(index.find_node("b").is_none());
    }
}
