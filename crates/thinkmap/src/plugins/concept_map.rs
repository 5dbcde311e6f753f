//! Concept maps: free-standing concepts joined by labelled connections
//!
//! Concepts carry stable ids; connections refer to those ids, so deleting a
//! concept also drops every connection touching it. An optional `topic`
//! string in the untyped fields acts as the focus question and cannot be
//! deleted.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    array_node_key, preserve_dimensions, reindex_dimensions, root_delete_message,
    DiagramOperations, OperationContext, OperationOutcome,
};
use crate::core::{
    ConceptMapSpec, ConceptNode, DiagramSpec, DiagramType, EditorEvent, NodeIndex, NodeUpdate,
    RenderedNode, SpecBody,
};

const NODE_TYPE: &str = "concept";
const TOPIC_FIELD: &str = "topic";

#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptMapOperations;

impl ConceptMapOperations {
    pub fn new() -> Self {
        Self
    }
}

fn body(spec: &DiagramSpec) -> Option<&ConceptMapSpec> {
    match &spec.body {
        SpecBody::ConceptMap(c) => Some(c),
        _ => None,
    }
}

fn body_mut(spec: &mut DiagramSpec) -> Option<&mut ConceptMapSpec> {
    match &mut spec.body {
        SpecBody::ConceptMap(c) => Some(c),
        _ => None,
    }
}

/// First `concept_<n>` id not already taken
fn next_concept_id(concepts: &[ConceptNode]) -> String {
    let taken: BTreeSet<&str> = concepts.iter().map(|c| c.id.as_str()).collect();
    (concepts.len()..)
        .map(|n| format!("concept_{}", n))
        .find(|id| !taken.contains(id.as_str()))
        .unwrap_or_default()
}

impl DiagramOperations for ConceptMapOperations {
    fn diagram_type(&self) -> DiagramType {
        DiagramType::ConceptMap
    }

    fn add_node(&self, spec: &mut DiagramSpec, ctx: &OperationContext<'_>) -> OperationOutcome {
        if !self.accepts(spec) {
            return OperationOutcome::NoOp;
        }
        let Some(concept_map) = body_mut(spec) else {
            return OperationOutcome::NoOp;
        };

        let id = next_concept_id(&concept_map.nodes);
        concept_map.nodes.push(ConceptNode {
            id: id.clone(),
            text: ctx.language.pick("新概念", "New Concept").to_string(),
        });
        let node_index = concept_map.nodes.len() - 1;
        info!(id = %id, node_index, "Concept added");

        ctx.emit(EditorEvent::NodeAdded {
            diagram_type: DiagramType::ConceptMap,
            node_type: NODE_TYPE.to_string(),
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

        // index -> node ids rendered for it
        let mut indices: BTreeMap<usize, Vec<&String>> = BTreeMap::new();
        let mut topic_refused = false;
        for node_id in node_ids {
            match ctx.document.find_node(node_id) {
                Some(node) if node.node_type == TOPIC_FIELD => {
                    warn!(node_id, "Refusing to delete focus topic");
                    ctx.warn_user(root_delete_message(ctx.language));
                    topic_refused = true;
                }
                Some(node) if node.node_type == NODE_TYPE => match node.array_index {
                    Some(index) => indices.entry(index).or_default().push(node_id),
                    None => warn!(node_id, "Concept without index"),
                },
                Some(node) => warn!(node_id, node_type = %node.node_type, "Unknown node type"),
                None => warn!(node_id, "Node not found in rendered document"),
            }
        }
        let Some(concept_map) = body_mut(spec) else {
            return OperationOutcome::NoOp;
        };
        let mut removed = Vec::new();
        let mut removed_ids = BTreeSet::new();
        let mut gone = Vec::new();
        for (index, ids) in indices.into_iter().rev() {
            if index < concept_map.nodes.len() {
                let concept = concept_map.nodes.remove(index);
                removed_ids.insert(concept.id);
                removed.push(index);
                gone.extend(ids);
            } else {
                debug!(index, "Concept index out of range, skipped");
            }
        }
        if removed.is_empty() {
            return if topic_refused {
                OperationOutcome::Rejected {
                    message: root_delete_message(ctx.language).to_string(),
                }
            } else {
                OperationOutcome::NoOp
            };
        }

        let before = concept_map.connections.len();
        concept_map
            .connections
            .retain(|c| !removed_ids.contains(&c.from) && !removed_ids.contains(&c.to));
        let dropped = before - concept_map.connections.len();

        reindex_dimensions(spec, NODE_TYPE, &removed);
        for id in gone.into_iter().chain(removed_ids.iter()) {
            spec.custom_positions.remove(id);
        }

        info!(deleted_indices = ?removed, dropped_connections = dropped, "Concepts deleted");
        ctx.emit(EditorEvent::NodesDeleted {
            diagram_type: DiagramType::ConceptMap,
            node_type: NODE_TYPE.to_string(),
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
            (TOPIC_FIELD, _) => {
                preserve_dimensions(spec, &node, TOPIC_FIELD, text);
                if let Some(concept_map) = body_mut(spec) {
                    concept_map
                        .extra
                        .insert(TOPIC_FIELD.to_string(), Value::String(text.to_string()));
                }
            }
            (NODE_TYPE, Some(index)) => {
                let in_range = body(spec).map(|c| index < c.nodes.len()).unwrap_or(false);
                if !in_range {
                    warn!(node_id, index, "Concept index out of range");
                    return OperationOutcome::NoOp;
                }
                preserve_dimensions(spec, &node, &array_node_key(NODE_TYPE, index), text);
                if let Some(concept) = body_mut(spec).and_then(|c| c.nodes.get_mut(index)) {
                    concept.text = text.to_string();
                }
            }
            _ => {
                warn!(node_id, node_type = %node.node_type, "Unknown node type");
                return OperationOutcome::NoOp;
            }
        }

        ctx.emit(EditorEvent::NodeUpdated {
            diagram_type: DiagramType::ConceptMap,
            node_id: node_id.to_string(),
            node_type: node.node_type.clone(),
            updates: updates.clone(),
            spec: spec.clone(),
        });
        ctx.complete("update_node", spec);
        OperationOutcome::Applied
    }

    fn validate_spec(&self, spec: &DiagramSpec) -> bool {
        let Some(concept_map) = body(spec) else {
            return false;
        };
        let mut ids = BTreeSet::new();
        for concept in &concept_map.nodes {
            if concept.id.is_empty() || !ids.insert(concept.id.as_str()) {
                return false;
            }
        }
        concept_map
            .connections
            .iter()
            .all(|c| ids.contains(c.from.as_str()) && ids.contains(c.to.as_str()))
    }

    fn node_index(&self, spec: &DiagramSpec) -> NodeIndex {
        let mut index = NodeIndex::new();
        let Some(concept_map) = body(spec) else {
            return index;
        };
        if let Some(Value::String(topic)) = concept_map.extra.get(TOPIC_FIELD) {
            index.insert(RenderedNode::new(TOPIC_FIELD, TOPIC_FIELD).with_text(topic.as_str()));
        }
        for (i, concept) in concept_map.nodes.iter().enumerate() {
            index.insert(
                RenderedNode::new(array_node_key(NODE_TYPE, i), NODE_TYPE)
                    .with_index(i)
                    .with_text(concept.text.as_str()),
            );
        }
        index
    }
}
