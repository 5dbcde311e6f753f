//! Bridge maps: a list of left/right analogy pairs with no root node
//!
//! Both halves of a pair render as separate nodes (`left` / `right` with the
//! pair index). Adding or deleting always works on whole pairs. The optional
//! relating factor lives in the untyped `dimension` field.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    array_node_key, preserve_dimensions, reindex_dimensions, DiagramOperations, OperationContext,
    OperationOutcome,
};
use crate::core::{
    Analogy, BridgeMapSpec, DiagramSpec, DiagramType, EditorEvent, Language, NodeIndex,
    NodeUpdate, RenderedNode, SpecBody,
};

const DIMENSION_FIELD: &str = "dimension";

#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeMapOperations;

impl BridgeMapOperations {
    pub fn new() -> Self {
        Self
    }

    fn placeholders(language: Language) -> (&'static str, &'static str) {
        match language {
            Language::Zh => ("新事物A", "新事物B"),
            Language::En => ("New Item A", "New Item B"),
        }
    }
}

fn body(spec: &DiagramSpec) -> Option<&BridgeMapSpec> {
    match &spec.body {
        SpecBody::BridgeMap(b) => Some(b),
        _ => None,
    }
}

fn body_mut(spec: &mut DiagramSpec) -> Option<&mut BridgeMapSpec> {
    match &mut spec.body {
        SpecBody::BridgeMap(b) => Some(b),
        _ => None,
    }
}

impl DiagramOperations for BridgeMapOperations {
    fn diagram_type(&self) -> DiagramType {
        DiagramType::BridgeMap
    }

    fn add_node(&self, spec: &mut DiagramSpec, ctx: &OperationContext<'_>) -> OperationOutcome {
        if !self.accepts(spec) {
            return OperationOutcome::NoOp;
        }
        let Some(bridge) = body_mut(spec) else {
            return OperationOutcome::NoOp;
        };
        let (left, right) = Self::placeholders(ctx.language);
        bridge.analogies.push(Analogy {
            left: left.to_string(),
            right: right.to_string(),
        });
        let node_index = bridge.analogies.len() - 1;
        info!(node_index, "Analogy pair added");

        ctx.emit(EditorEvent::NodeAdded {
            diagram_type: DiagramType::BridgeMap,
            node_type: "analogy".to_string(),
            node_index,
            spec: spec.clone(),
        });
        ctx.complete("add_node", spec);
        OperationOutcome::Applied
    }

    fn delete_nodes(
        &self,
        spec: &mut DiagramSpec,
        node_ids: &[String],
        ctx: &OperationContext<'_>,
    ) -> OperationOutcome {
        if !self.accepts(spec) || node_ids.is_empty() {
            return OperationOutcome::NoOp;
        }

        // pair index -> node ids rendered for either half
        let mut pairs: BTreeMap<usize, Vec<&String>> = BTreeMap::new();
        for node_id in node_ids {
            match ctx.document.find_node(node_id) {
                Some(node) if node.node_type == "left" || node.node_type == "right" => {
                    match node.array_index {
                        Some(index) => pairs.entry(index).or_default().push(node_id),
                        None => warn!(node_id, "Analogy node without index"),
                    }
                }
                Some(node) => {
                    warn!(node_id, node_type = %node.node_type, "Node type is not deletable")
                }
                None => warn!(node_id, "Node not found in rendered document"),
            }
        }

        let Some(bridge) = body_mut(spec) else {
            return OperationOutcome::NoOp;
        };
        let mut removed = Vec::new();
        let mut gone = Vec::new();
        for (index, ids) in pairs.into_iter().rev() {
            if index < bridge.analogies.len() {
                bridge.analogies.remove(index);
                removed.push(index);
                gone.extend(ids);
            } else {
                debug!(index, "Analogy index out of range, skipped");
            }
        }
        if removed.is_empty() {
            return OperationOutcome::NoOp;
        }

        reindex_dimensions(spec, "left", &removed);
        reindex_dimensions(spec, "right", &removed);
        for node_id in gone {
            spec.custom_positions.remove(node_id);
        }

        info!(deleted_indices = ?removed, "Analogy pairs deleted");
        ctx.emit(EditorEvent::NodesDeleted {
            diagram_type: DiagramType::BridgeMap,
            node_type: "analogy".to_string(),
            deleted_indices: removed,
            spec: spec.clone(),
        });
        ctx.complete("delete_nodes", spec);
        OperationOutcome::Applied
    }

    fn update_node(
        &self,
        spec: &mut DiagramSpec,
        node_id: &str,
        updates: &NodeUpdate,
        ctx: &OperationContext<'_>,
    ) -> OperationOutcome {
        if !self.accepts(spec) {
            return OperationOutcome::NoOp;
        }
        let Some(text) = updates.text.as_deref() else {
            return OperationOutcome::NoOp;
        };
        let Some(node) = ctx.document.find_node(node_id) else {
            warn!(node_id, "Node not found in rendered document");
            return OperationOutcome::NoOp;
        };

        match (node.node_type.as_str(), node.array_index) {
            (side @ ("left" | "right"), Some(index)) => {
                let in_range = body(spec).map(|b| index < b.analogies.len()).unwrap_or(false);
                if !in_range {
                    warn!(node_id, index, "Analogy index out of range");
                    return OperationOutcome::NoOp;
                }
                preserve_dimensions(spec, &node, &array_node_key(side, index), text);
                if let Some(pair) = body_mut(spec).and_then(|b| b.analogies.get_mut(index)) {
                    if side == "left" {
                        pair.left = text.to_string();
                    } else {
                        pair.right = text.to_string();
                    }
                }
            }
            (DIMENSION_FIELD, _) => {
                if let Some(bridge) = body_mut(spec) {
                    bridge
                        .extra
                        .insert(DIMENSION_FIELD.to_string(), Value::String(text.to_string()));
                }
            }
            _ => {
                warn!(node_id, node_type = %node.node_type, "Unknown node type");
                return OperationOutcome::NoOp;
            }
        }

        ctx.emit(EditorEvent::NodeUpdated {
            diagram_type: DiagramType::BridgeMap,
            node_id: node_id.to_string(),
            node_type: node.node_type.clone(),
            updates: updates.clone(),
            spec: spec.clone(),
        });
        ctx.complete("update_node", spec);
        OperationOutcome::Applied
    }

    fn validate_spec(&self, spec: &DiagramSpec) -> bool {
        body(spec).is_some()
            && spec
                .custom_positions
                .values()
                .all(|p| p.x.is_finite() && p.y.is_finite())
    }

    fn node_index(&self, spec: &DiagramSpec) -> NodeIndex {
        let mut index = NodeIndex::new();
        let Some(bridge) = body(spec) else {
            return index;
        };
        if let Some(Value::String(dimension)) = bridge.extra.get(DIMENSION_FIELD) {
            index.insert(
                RenderedNode::new(DIMENSION_FIELD, DIMENSION_FIELD).with_text(dimension.as_str()),
            );
        }
        for (i, pair) in bridge.analogies.iter().enumerate() {
            index.insert(
                RenderedNode::new(array_node_key("left", i), "left")
                    .with_index(i)
                    .with_text(pair.left.as_str()),
            );
            index.insert(
                RenderedNode::new(array_node_key("right", i), "right")
                    .with_index(i)
                    .with_text(pair.right.as_str()),
            );
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventBus, Position, RenderedDocument};
    use std::sync::{Arc, Mutex};

    fn bridge(pairs: &[(&str, &str)]) -> DiagramSpec {
        DiagramSpec::new(SpecBody::BridgeMap(BridgeMapSpec {
            analogies: pairs
                .iter()
                .map(|(l, r)| Analogy {
                    left: l.to_string(),
                    right: r.to_string(),
                })
                .collect(),
            ..Default::default()
        }))
    }

    #[test]
    fn test_add_pair() {
        let bus = EventBus::new();
        let mut spec = bridge(&[("Bird", "Nest")]);
        let doc = BridgeMapOperations.node_index(&spec);
        let ctx = OperationContext::new(&bus, &doc, Language::En);
        assert!(BridgeMapOperations.add_node(&mut spec, &ctx).is_applied());
        let pairs = &body(&spec).unwrap().analogies;
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].left, "New Item A");
    }

    #[test]
    fn test_delete_either_half_removes_pair() {
        let bus = EventBus::new();
        let mut spec = bridge(&[("Bird", "Nest"), ("Bee", "Hive"), ("Fox", "Den")]);
        let doc = BridgeMapOperations.node_index(&spec);
        let ctx = OperationContext::new(&bus, &doc, Language::En);
        let ids = vec!["right-0".to_string(), "left-2".to_string(), "left-0".to_string()];
        assert!(BridgeMapOperations.delete_nodes(&mut spec, &ids, &ctx).is_applied());
        let pairs = &body(&spec).unwrap().analogies;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].left, "Bee");
    }

    #[test]
    fn test_update_right_half_and_dimension() {
        let bus = EventBus::new();
        let mut spec = bridge(&[("Bird", "Nest")]);
        if let Some(b) = body_mut(&mut spec) {
            b.extra.insert("dimension".into(), Value::String("lives in".into()));
        }
        let doc = BridgeMapOperations.node_index(&spec);
        assert!(doc.find_node("dimension").is_some());
        let ctx = OperationContext::new(&bus, &doc, Language::En);

        BridgeMapOperations.update_node(&mut spec, "right-0", &NodeUpdate::text("Tree"), &ctx);
        BridgeMapOperations.update_node(&mut spec, "dimension", &NodeUpdate::text("home"), &ctx);

        let b = body(&spec).unwrap();
        assert_eq!(b.analogies[0].right, "Tree");
        assert_eq!(b.extra["dimension"], Value::String("home".into()));
    }

    #[test]
    fn test_dimension_is_not_deletable() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.on("diagram:nodes_deleted", move |event| {
            sink.lock().unwrap().push(event.topic().to_string());
            Ok(())
        });
        let mut spec = bridge(&[("Bird", "Nest")]);
        if let Some(b) = body_mut(&mut spec) {
            b.extra.insert("dimension".into(), Value::String("lives in".into()));
        }
        let before = spec.clone();
        let doc = BridgeMapOperations.node_index(&spec);
        let ctx = OperationContext::new(&bus, &doc, Language::En);

        let outcome = BridgeMapOperations.delete_nodes(&mut spec, &["dimension".into()], &ctx);

        assert_eq!(outcome, OperationOutcome::NoOp);
        assert_eq!(spec, before);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_pair_keeps_position() {
        let bus = EventBus::new();
        let mut spec = bridge(&[("Bird", "Nest"), ("Bee", "Hive")]);
        spec.custom_positions.insert("left-1".into(), Position::new(1.0, 1.0));
        spec.custom_positions.insert("ghost".into(), Position::new(3.0, 3.0));
        let doc = BridgeMapOperations
            .node_index(&spec)
            .with_node(RenderedNode::new("ghost", "left").with_index(5));
        let ctx = OperationContext::new(&bus, &doc, Language::En);

        let ids = vec!["left-1".to_string(), "ghost".to_string()];
        assert!(BridgeMapOperations.delete_nodes(&mut spec, &ids, &ctx).is_applied());

        assert_eq!(body(&spec).unwrap().analogies.len(), 1);
        assert!(!spec.custom_positions.contains_key("left-1"));
        assert!(spec.custom_positions.contains_key("ghost"));
    }
}
