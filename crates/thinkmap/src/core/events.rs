//! Typed events carried by the [`EventBus`](super::EventBus)
//!
//! Each variant maps to one dotted topic string. Hosts that need topics the
//! kernel does not know about use [`EditorEvent::Custom`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::spec::DiagramSpec;
use super::types::{DiagramType, Position};
use crate::validation::ConsistencyReport;

/// Topic names, as seen on the wire of the internal mesh
pub mod topics {
    pub const NODE_ADDED: &str = "diagram:node_added";
    pub const NODES_DELETED: &str = "diagram:nodes_deleted";
    pub const NODE_UPDATED: &str = "diagram:node_updated";
    pub const POSITION_SAVED: &str = "diagram:position_saved";
    pub const POSITIONS_CLEARED: &str = "diagram:positions_cleared";
    pub const OPERATION_COMPLETED: &str = "diagram:operation_completed";
    pub const OPERATION_WARNING: &str = "diagram:operation_warning";
    pub const SPEC_UPDATED: &str = "diagram:spec_updated";
    pub const SELECTION_CLEARED: &str = "diagram:selection_cleared";
    pub const RESET_REQUESTED: &str = "diagram:reset_requested";

    pub const HISTORY_SAVED: &str = "history:saved";
    pub const HISTORY_CLEARED: &str = "history:cleared";
    pub const HISTORY_STATE_CHANGED: &str = "history:state_changed";
    pub const UNDO_REQUESTED: &str = "history:undo_requested";
    pub const REDO_REQUESTED: &str = "history:redo_requested";
    pub const CLEAR_REQUESTED: &str = "history:clear_requested";
    pub const UNDO_COMPLETED: &str = "history:undo_completed";
    pub const REDO_COMPLETED: &str = "history:redo_completed";
    pub const UNDO_FAILED: &str = "history:undo_failed";
    pub const REDO_FAILED: &str = "history:redo_failed";

    pub const DUPLICATE_REQUESTED: &str = "node:duplicate_requested";

    pub const GENERATION_COMPLETED: &str = "llm:generation_completed";
    pub const CONSISTENCY_REPORT: &str = "llm:consistency_report";
}

/// Text edit applied by `update_node`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl NodeUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Cursor summary broadcast on `history:state_changed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub history_size: usize,
    /// `None` while the stack is empty
    pub history_index: Option<usize>,
}

/// Payload of `history:undo_completed` / `history:redo_completed`
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRestore {
    pub action: String,
    pub metadata: Value,
    /// A private clone; the history stack keeps its own copy
    pub spec: DiagramSpec,
    pub history_index: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Every event the kernel emits or listens for
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    NodeAdded {
        diagram_type: DiagramType,
        node_type: String,
        node_index: usize,
        spec: DiagramSpec,
    },
    NodesDeleted {
        diagram_type: DiagramType,
        node_type: String,
        /// Descending, in removal order
        deleted_indices: Vec<usize>,
        spec: DiagramSpec,
    },
    NodeUpdated {
        diagram_type: DiagramType,
        node_id: String,
        node_type: String,
        updates: NodeUpdate,
        spec: DiagramSpec,
    },
    PositionSaved {
        diagram_type: DiagramType,
        node_id: String,
        position: Position,
        spec: DiagramSpec,
    },
    PositionsCleared {
        diagram_type: DiagramType,
        spec: DiagramSpec,
    },
    OperationCompleted {
        operation: String,
        snapshot: Option<DiagramSpec>,
        data: Option<Value>,
    },
    OperationWarning {
        message: String,
        kind: String,
    },
    SpecUpdated {
        spec: DiagramSpec,
    },
    SelectionCleared,
    ResetRequested,

    HistorySaved {
        action: String,
        history_index: usize,
        history_size: usize,
    },
    HistoryCleared,
    HistoryStateChanged(HistoryStatus),
    UndoRequested,
    RedoRequested,
    HistoryClearRequested,
    UndoCompleted(HistoryRestore),
    RedoCompleted(HistoryRestore),
    UndoFailed {
        reason: String,
    },
    RedoFailed {
        reason: String,
    },

    DuplicateRequested,

    GenerationCompleted {
        models: Vec<String>,
        succeeded: usize,
        failed: usize,
    },
    ConsistencyReport(ConsistencyReport),

    Custom {
        topic: String,
        payload: Value,
    },
}

impl EditorEvent {
    /// Topic this event is delivered on
    pub fn topic(&self) -> &str {
        match self {
            EditorEvent::NodeAdded { .. } => topics::NODE_ADDED,
            EditorEvent::NodesDeleted { .. } => topics::NODES_DELETED,
            EditorEvent::NodeUpdated { .. } => topics::NODE_UPDATED,
            EditorEvent::PositionSaved { .. } => topics::POSITION_SAVED,
            EditorEvent::PositionsCleared { .. } => topics::POSITIONS_CLEARED,
            EditorEvent::OperationCompleted { .. } => topics::OPERATION_COMPLETED,
            EditorEvent::OperationWarning { .. } => topics::OPERATION_WARNING,
            EditorEvent::SpecUpdated { .. } => topics::SPEC_UPDATED,
            EditorEvent::SelectionCleared => topics::SELECTION_CLEARED,
            EditorEvent::ResetRequested => topics::RESET_REQUESTED,
            EditorEvent::HistorySaved { .. } => topics::HISTORY_SAVED,
            EditorEvent::HistoryCleared => topics::HISTORY_CLEARED,
            EditorEvent::HistoryStateChanged(_) => topics::HISTORY_STATE_CHANGED,
            EditorEvent::UndoRequested => topics::UNDO_REQUESTED,
            EditorEvent::RedoRequested => topics::REDO_REQUESTED,
            EditorEvent::HistoryClearRequested => topics::CLEAR_REQUESTED,
            EditorEvent::UndoCompleted(_) => topics::UNDO_COMPLETED,
            EditorEvent::RedoCompleted(_) => topics::REDO_COMPLETED,
            EditorEvent::UndoFailed { .. } => topics::UNDO_FAILED,
            EditorEvent::RedoFailed { .. } => topics::REDO_FAILED,
            EditorEvent::DuplicateRequested => topics::DUPLICATE_REQUESTED,
            EditorEvent::GenerationCompleted { .. } => topics::GENERATION_COMPLETED,
            EditorEvent::ConsistencyReport(_) => topics::CONSISTENCY_REPORT,
            EditorEvent::Custom { topic, .. } => topic,
        }
    }

    /// Build the `diagram:operation_completed` envelope for a mutation
    pub fn completed(operation: impl Into<String>, snapshot: &DiagramSpec) -> Self {
        EditorEvent::OperationCompleted {
            operation: operation.into(),
            snapshot: Some(snapshot.clone()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{BubbleMapSpec, SpecBody};

    #[test]
    fn test_topics_match_wire_names() {
        assert_eq!(EditorEvent::UndoRequested.topic(), "history:undo_requested");
        assert_eq!(EditorEvent::ResetRequested.topic(), "diagram:reset_requested");
        assert_eq!(EditorEvent::DuplicateRequested.topic(), "node:duplicate_requested");
        let custom = EditorEvent::Custom {
            topic: "toolbar:export".into(),
            payload: Value::Null,
        };
        assert_eq!(custom.topic(), "toolbar:export");
    }

    #[test]
    fn test_completed_envelope_clones_snapshot() {
        let spec = DiagramSpec::new(SpecBody::BubbleMap(BubbleMapSpec {
            topic: "T".into(),
            ..Default::default()
        }));
        match EditorEvent::completed("add_node", &spec) {
            EditorEvent::OperationCompleted {
                operation,
                snapshot,
                data,
            } => {
                assert_eq!(operation, "add_node");
                assert_eq!(snapshot.as_ref(), Some(&spec));
                assert!(data.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
