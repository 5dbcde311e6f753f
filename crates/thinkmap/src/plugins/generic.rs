//! Table-driven operations for the single-root diagram types
//!
//! Bubble, circle, mind, tree, brace, double-bubble, flow and multi-flow
//! maps all follow the same rules; only the [`Shape`] differs.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::shape::{shape_for, Shape};
use super::{
    array_node_key, preserve_dimensions, reindex_dimensions, root_delete_message,
    DiagramOperations, OperationContext, OperationOutcome,
};
use crate::core::{
    DiagramSpec, DiagramType, EditorEvent, NodeIndex, NodeUpdate, RenderedNode,
};

/// [`DiagramOperations`] driven by a static [`Shape`]
#[derive(Debug, Clone, Copy)]
pub struct TableOperations {
    shape: &'static Shape,
}

impl TableOperations {
    pub fn new(shape: &'static Shape) -> Self {
        Self { shape }
    }

    /// `None` for types that need a dedicated plugin
    pub fn for_type(diagram_type: DiagramType) -> Option<Self> {
        shape_for(diagram_type).map(Self::new)
    }

    pub fn shape(&self) -> &'static Shape {
        self.shape
    }
}

impl DiagramOperations for TableOperations {
    fn diagram_type(&self) -> DiagramType {
        self.shape.diagram_type
    }

    fn add_node(&self, spec: &mut DiagramSpec, ctx: &OperationContext<'_>) -> OperationOutcome {
        if !self.accepts(spec) {
            return OperationOutcome::NoOp;
        }

        let selected = ctx.selected_node_type();
        let Some(slot) = self.shape.target_list(selected.as_deref()) else {
            return OperationOutcome::NoOp;
        };
        let Some(list) = spec.body.list_mut(slot.field) else {
            warn!(field = slot.field, "Spec has no target array");
            return OperationOutcome::NoOp;
        };

        list.push_placeholder(slot.placeholder(ctx.language));
        let node_index = list.len() - 1;
        info!(
            diagram_type = %self.shape.diagram_type,
            node_type = slot.node_type,
            node_index,
            "Node added"
        );

        ctx.emit(EditorEvent::NodeAdded {
            diagram_type: self.shape.diagram_type,
            node_type: slot.node_type.to_string(),
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

        // field -> (node type, (index, node id) pairs)
        let mut targets: BTreeMap<&'static str, (&'static str, Vec<(usize, &String)>)> =
            BTreeMap::new();
        let mut root_refused = false;

        for node_id in node_ids {
            let Some(node) = ctx.document.find_node(node_id) else {
                warn!(node_id, "Node not found in rendered document");
                continue;
            };
            if self.shape.root_for(&node.node_type).is_some() {
                warn!(node_id, node_type = %node.node_type, "Refusing to delete root node");
                ctx.warn_user(root_delete_message(ctx.language));
                root_refused = true;
                continue;
            }
            let Some(slot) = self.shape.list_for(&node.node_type) else {
                warn!(node_id, node_type = %node.node_type, "Unknown node type");
                continue;
            };
            let Some(index) = node.array_index else {
                warn!(node_id, "Array node without index");
                continue;
            };
            targets
                .entry(slot.field)
                .or_insert_with(|| (slot.node_type, Vec::new()))
                .1
                .push((index, node_id));
        }

        let mut applied = Vec::new();
        for (field, (node_type, mut members)) in targets {
            let Some(list) = spec.body.list_mut(field) else {
                continue;
            };
            members.sort_unstable_by(|a, b| b.0.cmp(&a.0));
            let mut removed: Vec<usize> = Vec::new();
            let mut gone = Vec::new();
            for (index, node_id) in members {
                if removed.last() == Some(&index) {
                    gone.push(node_id);
                } else if list.remove_at(index) {
                    removed.push(index);
                    gone.push(node_id);
                } else {
                    debug!(field, index, node_id = %node_id, "Index out of range, skipped");
                }
            }
            if removed.is_empty() {
                continue;
            }
            reindex_dimensions(spec, node_type, &removed);
            for node_id in gone {
                spec.custom_positions.remove(node_id);
            }
            applied.push((node_type, removed));
        }

        if applied.is_empty() {
            return if root_refused {
                OperationOutcome::Rejected {
                    message: root_delete_message(ctx.language).to_string(),
                }
            } else {
                OperationOutcome::NoOp
            };
        }

        for (node_type, deleted_indices) in applied {
            info!(node_type, ?deleted_indices, "Nodes deleted");
            ctx.emit(EditorEvent::NodesDeleted {
                diagram_type: self.shape.diagram_type,
                node_type: node_type.to_string(),
                deleted_indices,
                spec: spec.clone(),
            });
        }
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

        if let Some(root) = self.shape.root_for(&node.node_type) {
            preserve_dimensions(spec, &node, root.key, text);
            let Some(field) = spec.body.root_field_mut(root.field) else {
                return OperationOutcome::NoOp;
            };
            *field = text.to_string();
        } else if let Some(slot) = self.shape.list_for(&node.node_type) {
            let Some(index) = node.array_index else {
                warn!(node_id, "Array node without index");
                return OperationOutcome::NoOp;
            };
            let in_range = spec
                .body
                .list(slot.field)
                .map(|list| index < list.len())
                .unwrap_or(false);
            if !in_range {
                warn!(node_id, index, field = slot.field, "Index out of range");
                return OperationOutcome::NoOp;
            }
            preserve_dimensions(spec, &node, &array_node_key(slot.node_type, index), text);
            if let Some(list) = spec.body.list_mut(slot.field) {
                list.set_text_at(index, text.to_string());
            }
        } else {
            warn!(node_id, node_type = %node.node_type, "Unknown node type");
            return OperationOutcome::NoOp;
        }

        debug!(node_id, node_type = %node.node_type, "Node updated");
        ctx.emit(EditorEvent::NodeUpdated {
            diagram_type: self.shape.diagram_type,
            node_id: node_id.to_string(),
            node_type: node.node_type.clone(),
            updates: updates.clone(),
            spec: spec.clone(),
        });
        ctx.complete("update_node", spec);
        OperationOutcome::Applied
    }

    fn validate_spec(&self, spec: &DiagramSpec) -> bool {
        if spec.diagram_type() != self.shape.diagram_type {
            return false;
        }
        let roots_ok = self
            .shape
            .roots
            .iter()
            .all(|root| spec.body.root_field(root.field).is_some());
        let lists_ok = self
            .shape
            .lists
            .iter()
            .all(|list| spec.body.list(list.field).is_some());
        let positions_ok = spec
            .custom_positions
            .values()
            .all(|p| p.x.is_finite() && p.y.is_finite());
        roots_ok && lists_ok && positions_ok
    }

    fn node_index(&self, spec: &DiagramSpec) -> NodeIndex {
        let mut index = NodeIndex::new();
        for root in self.shape.roots {
            if let Some(text) = spec.body.root_field(root.field) {
                let node_type = root.node_types.first().copied().unwrap_or(root.field);
                index.insert(RenderedNode::new(root.key, node_type).with_text(text));
            }
        }
        for slot in self.shape.lists {
            let Some(list) = spec.body.list(slot.field) else {
                continue;
            };
            for i in 0..list.len() {
                let text = list.text_at(i).unwrap_or_default();
                index.insert(
                    RenderedNode::new(array_node_key(slot.node_type, i), slot.node_type)
                        .with_index(i)
                        .with_text(text),
                );
            }
        }
        index
    }
}
