//! State store: the single source of truth for the active diagram
//!
//! Operation modules read the diagram type from here rather than from any
//! editor-local cache.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::spec::DiagramSpec;
use super::types::DiagramType;

/// Snapshot of the active diagram
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagramState {
    pub diagram_type: Option<DiagramType>,
    pub spec: Option<DiagramSpec>,
    /// Node ids currently selected in the canvas
    pub selected_nodes: Vec<String>,
}

/// Shared container for the active `{ diagram_type, spec }`
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    state: Arc<RwLock<DiagramState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the current state
    pub fn get_diagram_state(&self) -> DiagramState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn diagram_type(&self) -> Option<DiagramType> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .diagram_type
    }

    /// Install a spec; the diagram type follows the spec
    pub fn set_diagram(&self, spec: DiagramSpec) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let diagram_type = spec.diagram_type();
        if state.diagram_type != Some(diagram_type) {
            debug!(from = ?state.diagram_type, to = %diagram_type, "Active diagram type changed");
            state.selected_nodes.clear();
        }
        state.diagram_type = Some(diagram_type);
        state.spec = Some(spec);
    }

    /// Mutate the active spec in place; returns `None` when no diagram is loaded
    pub fn with_spec_mut<R>(&self, f: impl FnOnce(&mut DiagramSpec) -> R) -> Option<R> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.spec.as_mut().map(f)
    }

    pub fn set_selection(&self, node_ids: Vec<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .selected_nodes = node_ids;
    }

    pub fn selection(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selected_nodes
            .clone()
    }

    /// Clear the selection; returns true when something was selected
    pub fn clear_selection(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let had_selection = !state.selected_nodes.is_empty();
        state.selected_nodes.clear();
        had_selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{CircleMapSpec, FlowMapSpec, SpecBody};

    fn circle() -> DiagramSpec {
        DiagramSpec::new(SpecBody::CircleMap(CircleMapSpec {
            topic: "X".into(),
            context: vec!["a".into()],
            ..Default::default()
        }))
    }

    #[test]
    fn test_empty_store() {
        let store = StateStore::new();
        let state = store.get_diagram_state();
        assert!(state.diagram_type.is_none());
        assert!(state.spec.is_none());
        assert!(store.with_spec_mut(|_| ()).is_none());
    }

    #[test]
    fn test_set_diagram_tracks_type() {
        let store = StateStore::new();
        store.set_diagram(circle());
        assert_eq!(store.diagram_type(), Some(DiagramType::CircleMap));
    }

    #[test]
    fn test_type_change_clears_selection() {
        let store = StateStore::new();
        store.set_diagram(circle());
        store.set_selection(vec!["n1".into()]);
        store.set_diagram(circle());
        assert_eq!(store.selection(), vec!["n1".to_string()]);

        store.set_diagram(DiagramSpec::new(SpecBody::FlowMap(FlowMapSpec::default())));
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = StateStore::new();
        let other = store.clone();
        store.set_diagram(circle());
        other.with_spec_mut(|spec| spec.body.list_mut("context").unwrap().push_placeholder("b"));
        let state = store.get_diagram_state();
        assert_eq!(state.spec.unwrap().body.list("context").unwrap().len(), 2);
    }
}
