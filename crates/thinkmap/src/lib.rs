//! Thinkmap - editing kernel for thinking-map diagrams
//!
//! Bubble, circle, mind, tree, brace, bridge, double-bubble, flow,
//! multi-flow and concept maps share one event-driven editing model:
//! per-type operation modules mutate a spec, an undo/redo history records
//! snapshots, validators judge completeness and schema, and a multi-model
//! engine generates candidate specs from a prompt.
//!
//! # Quick Start
//!
//! ```rust
//! use thinkmap::editor::DiagramEditor;
//! use thinkmap::{DiagramType, EventBus};
//!
//! let editor = DiagramEditor::headless(EventBus::new());
//! editor.select_diagram_type(DiagramType::BubbleMap);
//! editor.add_node().unwrap();
//! editor.undo();
//! assert_eq!(editor.history().status().history_index, Some(0));
//! ```
//!
//! # Checking a generated spec
//!
//! ```rust
//! use serde_json::json;
//!
//! let report = thinkmap::validate_properties(
//!     "bridge_map",
//!     &json!({ "analogies": [{ "left": "L" }] }),
//! );
//! assert!(!report.is_valid);
//! assert_eq!(report.missing_fields, vec!["analogies[0].right"]);
//! ```

pub mod core;
pub mod editor;
pub mod llm;
pub mod plugins;
pub mod validation;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;
pub use validation::{
    analyze_consistency, validate_properties, ConsistencyReport, DiagramValidation,
    DiagramValidator, PropertyValidation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        DiagramSpec, DiagramType, EditorError, EditorEvent, EventBus, HistoryManager,
        KernelConfig, Language, NodeUpdate, Position, StateStore,
    };
    pub use crate::editor::{
        blank_template, BuiltinTemplates, Collaborators, DiagramEditor, TemplateSource,
    };
    pub use crate::llm::{GenerationRequest, HttpTransport, LlmEngineManager, LlmResultCache};
    pub use crate::plugins::{DiagramOperations, OperationContext, OperationOutcome, OperationRegistry};
}

/// Decode and structurally check a spec of the given wire type
///
/// # Example
/// ```rust
/// use serde_json::json;
///
/// let spec = thinkmap::parse_spec("mind_map", json!({ "topic": "T", "children": [] })).unwrap();
/// assert_eq!(spec.diagram_type(), thinkmap::DiagramType::MindMap);
/// ```
pub fn parse_spec(diagram_type: &str, value: serde_json::Value) -> Result<DiagramSpec, EditorError> {
    let diagram_type: DiagramType = diagram_type.parse()?;
    let spec = DiagramSpec::from_value(diagram_type, value)?;
    let registry = plugins::OperationRegistry::with_all_plugins();
    match registry.get(diagram_type) {
        Some(module) if module.validate_spec(&spec) => Ok(spec),
        Some(_) => Err(EditorError::invalid_spec(
            diagram_type.as_str(),
            "structure does not match the diagram type",
        )),
        None => Err(EditorError::UnknownDiagramType {
            diagram_type: diagram_type.to_string(),
        }),
    }
}
