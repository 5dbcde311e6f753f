//! Editor glue
//!
//! [`DiagramEditor`] owns one diagram session. It routes toolbar and canvas
//! actions through the [`OperationRegistry`], keeps the [`StateStore`] in
//! step with history restores and hands warnings to the host.
//!
//! Operations read the rendered view from the [`Renderer`] at call time and
//! re-render after every applied mutation.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::{
    topics, DiagramSpec, DiagramType, EditorError, EditorEvent, EventBus, HistoryManager,
    KernelConfig, NodeIndex, NodeUpdate, Position, StateStore, WeakEventBus,
};
use crate::plugins::{DiagramOperations, OperationContext, OperationOutcome, OperationRegistry};
use crate::validation::{DiagramValidation, DiagramValidator, GatedControl};

mod host;
mod small_ops;
mod templates;

pub use host::*;
pub use small_ops::*;
pub use templates::*;

/// Owner tag for the editor's own bus listeners
pub const EDITOR_OWNER: &str = "diagram_editor";

pub struct DiagramEditor {
    bus: EventBus,
    store: StateStore,
    history: HistoryManager,
    small_ops: SmallOperationsManager,
    registry: Arc<OperationRegistry>,
    validator: DiagramValidator,
    host: Collaborators,
}

impl DiagramEditor {
    /// Build an editor on `bus` and subscribe every manager it owns
    pub fn new(bus: EventBus, config: &KernelConfig, host: Collaborators) -> Self {
        let store = StateStore::new();
        let history = HistoryManager::attached(bus.clone(), &config.history);

        let small_ops = SmallOperationsManager::new(bus.clone(), store.clone(), host.clone())
            .with_history_forward(selection_clearer(&store, &bus));
        small_ops.attach();

        let editor = Self {
            bus,
            store,
            history,
            small_ops,
            registry: Arc::new(OperationRegistry::with_all_plugins()),
            validator: DiagramValidator::new(&config.validator),
            host,
        };
        editor.attach();
        editor
    }

    /// Headless editor with default configuration
    pub fn headless(bus: EventBus) -> Self {
        let config = KernelConfig::default();
        let host = Collaborators::headless(config.language);
        Self::new(bus, &config, host)
    }

    fn attach(&self) {
        for topic in [topics::UNDO_COMPLETED, topics::REDO_COMPLETED] {
            let store = self.store.clone();
            let host = self.host.clone();
            let bus = self.bus.downgrade();
            self.bus.on_with_owner(topic, EDITOR_OWNER, move |event| {
                let restore = match event {
                    EditorEvent::UndoCompleted(r) | EditorEvent::RedoCompleted(r) => r,
                    other => anyhow::bail!("unexpected payload {:?}", other.topic()),
                };
                debug!(
                    action = %restore.action,
                    history_index = restore.history_index,
                    "Applying restored snapshot"
                );
                install(&store, &host, &bus, restore.spec.clone());
                Ok(())
            });
        }

        let host = self.host.clone();
        self.bus
            .on_with_owner(topics::OPERATION_WARNING, EDITOR_OWNER, move |event| {
                if let EditorEvent::OperationWarning { message, .. } = event {
                    host.notifications.notify(message, NotificationKind::Warning);
                }
                Ok(())
            });
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn small_operations(&self) -> &SmallOperationsManager {
        &self.small_ops
    }

    /// Active spec, if any
    pub fn spec(&self) -> Option<DiagramSpec> {
        self.store.get_diagram_state().spec
    }

    pub fn diagram_type(&self) -> Option<DiagramType> {
        self.store.diagram_type()
    }

    /// Start a fresh diagram of `diagram_type` from its blank template
    pub fn select_diagram_type(&self, diagram_type: DiagramType) {
        let blank = self.host.templates.blank(diagram_type, self.host.language);
        info!(diagram_type = %diagram_type, "Diagram type selected");
        self.start_session("select_diagram_type", blank);
    }

    /// Install a spec produced by generation
    ///
    /// A spec that fails its type's structural check is refused and the
    /// current diagram is kept.
    pub fn load_generated(&self, diagram_type: DiagramType, spec: Value) -> Result<(), EditorError> {
        let spec = DiagramSpec::from_value(diagram_type, spec)?;
        let module = self
            .registry
            .get(diagram_type)
            .ok_or_else(|| EditorError::UnknownDiagramType {
                diagram_type: diagram_type.to_string(),
            })?;
        if !module.validate_spec(&spec) {
            warn!(diagram_type = %diagram_type, "Generated spec failed structural check");
            return Err(EditorError::invalid_spec(
                diagram_type.as_str(),
                "structure does not match the diagram type",
            ));
        }
        info!(diagram_type = %diagram_type, "Generated diagram loaded");
        self.start_session("load_generated", spec);
        Ok(())
    }

    /// Replace the diagram and make it the only history entry
    fn start_session(&self, action: &str, spec: DiagramSpec) {
        if self.store.clear_selection() {
            self.bus.emit(EditorEvent::SelectionCleared);
        }
        install(&self.store, &self.host, &self.bus.downgrade(), spec.clone());
        self.history.clear();
        self.history.save_to_history(action, Value::Null, Some(&spec));
    }

    pub fn select_nodes(&self, node_ids: Vec<String>) {
        self.store.set_selection(node_ids);
    }

    pub fn selection(&self) -> Vec<String> {
        self.store.selection()
    }

    fn run<F>(&self, operation: &str, f: F) -> Result<OperationOutcome, EditorError>
    where
        F: FnOnce(&dyn DiagramOperations, &mut DiagramSpec, &OperationContext<'_>) -> OperationOutcome,
    {
        let document: NodeIndex = self.host.renderer.snapshot();
        let selection = self.store.selection();
        let ctx = OperationContext::new(&self.bus, &document, self.host.language)
            .with_selection(&selection);

        let outcome = self.registry.apply(&self.store, operation, &ctx, f)?;

        if outcome.is_applied() {
            if let Some(spec) = self.spec() {
                self.host.render_or_notify(&spec);
            }
        }
        Ok(outcome)
    }

    /// Append a node to the array of the current selection (or the default array)
    pub fn add_node(&self) -> Result<OperationOutcome, EditorError> {
        self.run("add_node", |module, spec, ctx| module.add_node(spec, ctx))
    }

    pub fn delete_nodes(&self, node_ids: &[String]) -> Result<OperationOutcome, EditorError> {
        self.run("delete_nodes", |module, spec, ctx| {
            module.delete_nodes(spec, node_ids, ctx)
        })
    }

    /// Delete whatever is selected, then clear the selection
    pub fn delete_selected(&self) -> Result<OperationOutcome, EditorError> {
        let selection = self.store.selection();
        if selection.is_empty() {
            debug!("Delete requested with empty selection");
            return Ok(OperationOutcome::NoOp);
        }
        let outcome = self.delete_nodes(&selection)?;
        if outcome.is_applied() && self.store.clear_selection() {
            self.bus.emit(EditorEvent::SelectionCleared);
        }
        Ok(outcome)
    }

    pub fn update_node(
        &self,
        node_id: &str,
        updates: &NodeUpdate,
    ) -> Result<OperationOutcome, EditorError> {
        self.run("update_node", |module, spec, ctx| {
            module.update_node(spec, node_id, updates, ctx)
        })
    }

    pub fn save_custom_position(
        &self,
        node_id: &str,
        position: Position,
    ) -> Result<OperationOutcome, EditorError> {
        self.run("save_custom_position", |module, spec, ctx| {
            module.save_custom_position(spec, node_id, position, true, ctx)
        })
    }

    /// Save a drag of several nodes as one history entry
    pub fn save_custom_positions(
        &self,
        positions: &[(String, Position)],
    ) -> Result<OperationOutcome, EditorError> {
        self.run("save_custom_positions", |module, spec, ctx| {
            let mut saved = 0;
            for (node_id, position) in positions {
                if module
                    .save_custom_position(spec, node_id, *position, false, ctx)
                    .is_applied()
                {
                    saved += 1;
                }
            }
            if saved == 0 {
                return OperationOutcome::NoOp;
            }
            debug!(saved, "Batch of custom positions saved");
            ctx.complete("save_custom_positions", spec);
            OperationOutcome::Applied
        })
    }

    pub fn clear_custom_positions(&self) -> Result<OperationOutcome, EditorError> {
        self.run("clear_custom_positions", |module, spec, ctx| {
            module.clear_custom_positions(spec, ctx)
        })
    }

    pub fn undo(&self) {
        self.bus.emit(EditorEvent::UndoRequested);
    }

    pub fn redo(&self) {
        self.bus.emit(EditorEvent::RedoRequested);
    }

    pub fn reset(&self) {
        self.bus.emit(EditorEvent::ResetRequested);
    }

    pub fn duplicate(&self) {
        self.bus.emit(EditorEvent::DuplicateRequested);
    }

    /// Completeness of what is currently drawn
    pub fn validate(&self) -> DiagramValidation {
        self.validator.validate(&self.host.renderer.snapshot())
    }

    /// Validate and enable or disable a learning-mode control
    pub fn validate_and_gate(&self, control: &mut dyn GatedControl) -> DiagramValidation {
        self.validator
            .validate_and_gate(&self.host.renderer.snapshot(), control)
    }

    /// Drop every listener the editor and its managers registered
    pub fn destroy(&self) -> usize {
        let removed = self.bus.remove_all_listeners_for_owner(EDITOR_OWNER)
            + self.small_ops.detach()
            + self.history.detach();
        debug!(removed, "Editor destroyed");
        removed
    }
}

impl std::fmt::Debug for DiagramEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramEditor")
            .field("diagram_type", &self.store.diagram_type())
            .field("history", &self.history.status())
            .field("host", &self.host)
            .finish()
    }
}

/// Store, draw and announce a whole new spec
fn install(store: &StateStore, host: &Collaborators, bus: &WeakEventBus, spec: DiagramSpec) {
    store.set_diagram(spec.clone());
    host.render_or_notify(&spec);
    if let Some(bus) = bus.upgrade() {
        bus.emit(EditorEvent::SpecUpdated { spec });
    }
}

/// Forwarded undo/redo: the restored spec may not contain the selected nodes
fn selection_clearer(store: &StateStore, bus: &EventBus) -> HistoryForward {
    let store = store.clone();
    let bus = bus.downgrade();
    Arc::new(move |direction| {
        debug!(?direction, "History request reached the editor");
        if store.clear_selection() {
            if let Some(bus) = bus.upgrade() {
                bus.emit(EditorEvent::SelectionCleared);
            }
        }
    })
}
