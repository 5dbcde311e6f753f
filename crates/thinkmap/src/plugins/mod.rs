//! Per-diagram-type operation plugins
//!
//! Every diagram type offers the same contract ([`DiagramOperations`]): add,
//! delete, update, save-custom-position, clear-custom-positions and a
//! structural check. Eight of the ten types differ only in which fields hold
//! the root text and the editable arrays, so they share one table-driven
//! implementation ([`TableOperations`] over [`Shape`]). Bridge maps and
//! concept maps have their own plugins.
//!
//! Mutations never fail across the plugin boundary: they return an
//! [`OperationOutcome`] and publish events. For any applied operation the
//! specific `diagram:*` event precedes `diagram:operation_completed`.
//! Events go through [`OperationContext::emit`], which the registry holds
//! until the new spec is back in the store.

use std::cell::RefCell;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{
    DiagramSpec, DiagramType, EditorEvent, EventBus, Language, NodeIndex, NodeUpdate, Position,
    RenderedDocument, RenderedNode,
};

pub mod bridge_map;
pub mod concept_map;
pub mod generic;
pub mod registry;
pub mod shape;

pub use bridge_map::*;
pub use concept_map::*;
pub use generic::*;
pub use registry::*;
pub use shape::*;

/// Everything an operation needs besides the spec itself
pub struct OperationContext<'a> {
    pub bus: &'a EventBus,
    pub document: &'a dyn RenderedDocument,
    pub language: Language,
    /// Selected node ids; `add_node` targets the array of the first one
    pub selection: &'a [String],
    /// Events held back while the spec is being written back
    pending: RefCell<Option<Vec<EditorEvent>>>,
}

impl<'a> OperationContext<'a> {
    pub fn new(bus: &'a EventBus, document: &'a dyn RenderedDocument, language: Language) -> Self {
        Self {
            bus,
            document,
            language,
            selection: &[],
            pending: RefCell::new(None),
        }
    }

    pub fn with_selection(mut self, selection: &'a [String]) -> Self {
        self.selection = selection;
        self
    }

    /// Node type of the first selected node that resolves in the document
    pub fn selected_node_type(&self) -> Option<String> {
        self.selection
            .iter()
            .find_map(|id| self.document.find_node(id))
            .map(|node| node.node_type)
    }

    /// Publish `event`, or queue it while the context is held
    pub fn emit(&self, event: EditorEvent) {
        if let Some(queue) = self.pending.borrow_mut().as_mut() {
            queue.push(event);
            return;
        }
        self.bus.emit(event);
    }

    /// Queue every event until [`release`](Self::release)
    pub fn hold(&self) {
        let mut pending = self.pending.borrow_mut();
        if pending.is_none() {
            *pending = Some(Vec::new());
        }
    }

    /// Publish queued events in order and stop queueing; returns how many
    pub fn release(&self) -> usize {
        let queued = self.pending.borrow_mut().take().unwrap_or_default();
        let count = queued.len();
        for event in queued {
            self.bus.emit(event);
        }
        count
    }

    /// Publish a `diagram:operation_warning` for the user
    pub fn warn_user(&self, message: &str) {
        self.emit(EditorEvent::OperationWarning {
            message: message.to_string(),
            kind: "warning".to_string(),
        });
    }

    /// Publish the `diagram:operation_completed` envelope
    pub fn complete(&self, operation: &str, spec: &DiagramSpec) {
        self.emit(EditorEvent::completed(operation, spec));
    }
}

/// Result of one mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The spec changed and events were published
    Applied,
    /// Refused with a user-visible reason; the spec is unchanged
    Rejected { message: String },
    /// Nothing to do; the spec is unchanged and nothing was published
    NoOp,
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, OperationOutcome::Applied)
    }
}

/// Shared per-type mutation contract
pub trait DiagramOperations: Send + Sync {
    fn diagram_type(&self) -> DiagramType;

    /// Append a localised placeholder to the target array
    fn add_node(&self, spec: &mut DiagramSpec, ctx: &OperationContext<'_>) -> OperationOutcome;

    /// Remove the array members behind `node_ids`; root nodes are refused
    fn delete_nodes(
        &self,
        spec: &mut DiagramSpec,
        node_ids: &[String],
        ctx: &OperationContext<'_>,
    ) -> OperationOutcome;

    /// Write new text into the root field or an array member
    fn update_node(
        &self,
        spec: &mut DiagramSpec,
        node_id: &str,
        updates: &NodeUpdate,
        ctx: &OperationContext<'_>,
    ) -> OperationOutcome;

    /// Type-specific structural check
    fn validate_spec(&self, spec: &DiagramSpec) -> bool;

    /// Synthetic rendered view of `spec`, with the node ids a renderer would assign
    fn node_index(&self, spec: &DiagramSpec) -> NodeIndex;

    /// Record a user-placed position; silent when `emit_events` is false
    fn save_custom_position(
        &self,
        spec: &mut DiagramSpec,
        node_id: &str,
        position: Position,
        emit_events: bool,
        ctx: &OperationContext<'_>,
    ) -> OperationOutcome {
        if !self.accepts(spec) {
            return OperationOutcome::NoOp;
        }
        if !position.x.is_finite() || !position.y.is_finite() {
            warn!(node_id, "Ignoring non-finite custom position");
            return OperationOutcome::NoOp;
        }

        spec.custom_positions.insert(node_id.to_string(), position);
        debug!(node_id, x = position.x, y = position.y, emit_events, "Custom position saved");

        if emit_events {
            ctx.emit(EditorEvent::PositionSaved {
                diagram_type: self.diagram_type(),
                node_id: node_id.to_string(),
                position,
                spec: spec.clone(),
            });
            ctx.complete("save_custom_position", spec);
        }
        OperationOutcome::Applied
    }

    /// Drop every user-placed position
    fn clear_custom_positions(
        &self,
        spec: &mut DiagramSpec,
        ctx: &OperationContext<'_>,
    ) -> OperationOutcome {
        if !self.accepts(spec) {
            return OperationOutcome::NoOp;
        }
        spec.custom_positions.clear();
        ctx.emit(EditorEvent::PositionsCleared {
            diagram_type: self.diagram_type(),
            spec: spec.clone(),
        });
        ctx.complete("clear_custom_positions", spec);
        OperationOutcome::Applied
    }

    /// True when `spec` belongs to this plugin; logs a warning otherwise
    fn accepts(&self, spec: &DiagramSpec) -> bool {
        let actual = spec.diagram_type();
        if actual != self.diagram_type() {
            warn!(
                expected = %self.diagram_type(),
                actual = %actual,
                "Spec does not match operation module"
            );
            return false;
        }
        true
    }
}

/// Localised refusal for deleting a root node
pub fn root_delete_message(language: Language) -> &'static str {
    language.pick("无法删除主题节点", "Cannot delete the main topic")
}

/// Key used in `_node_dimensions` for an array member
pub fn array_node_key(node_type: &str, index: usize) -> String {
    format!("{}-{}", node_type, index)
}

/// Copy preservation attributes before a node's text is emptied
///
/// Only empty text on an element that carries preserved values touches the
/// map; every other update leaves `_node_dimensions` as it was.
pub fn preserve_dimensions(spec: &mut DiagramSpec, node: &RenderedNode, key: &str, new_text: &str) {
    if new_text.is_empty() && node.has_preserved_dimensions() {
        debug!(key, preserved = ?node.preserved, "Preserving node dimensions");
        spec.node_dimensions.insert(key.to_string(), node.preserved);
    }
}

/// Shift `<node_type>-<i>` dimension keys after removing `removed` indices
pub fn reindex_dimensions(spec: &mut DiagramSpec, node_type: &str, removed: &[usize]) {
    let prefix = format!("{}-", node_type);
    let keys: Vec<String> = spec
        .node_dimensions
        .keys()
        .filter(|k| k.starts_with(&prefix))
        .cloned()
        .collect();

    let mut moved = Vec::new();
    for key in keys {
        let Some(index) = key[prefix.len()..].parse::<usize>().ok() else {
            continue;
        };
        let Some(dims) = spec.node_dimensions.remove(&key) else {
            continue;
        };
        if removed.contains(&index) {
            continue;
        }
        let shift = removed.iter().filter(|&&r| r < index).count();
        moved.push((array_node_key(node_type, index - shift), dims));
    }
    spec.node_dimensions.extend(moved);
}

/// Metadata attached to completed events that carry extra data
pub fn operation_data(pairs: &[(&str, Value)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}
