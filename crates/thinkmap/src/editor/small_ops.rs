//! Toolbar operations that do not touch a single node
//!
//! | listens to | action |
//! |---|---|
//! | `node:duplicate_requested` | "coming soon" notification |
//! | `history:undo_requested` | forwarded to the editor |
//! | `history:redo_requested` | forwarded to the editor |
//! | `diagram:reset_requested` | [`SmallOperationsManager::reset`] |

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::host::{Collaborators, NotificationKind};
use crate::core::{topics, EditorEvent, EventBus, StateStore, WeakEventBus};

/// Owner tag for the manager's bus listeners
pub const SMALL_OPS_OWNER: &str = "small_operations";

/// Which way a forwarded history request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    Undo,
    Redo,
}

/// Callback receiving forwarded undo/redo requests
pub type HistoryForward = Arc<dyn Fn(HistoryDirection) + Send + Sync>;

#[derive(Clone)]
pub struct SmallOperationsManager {
    bus: EventBus,
    store: StateStore,
    host: Collaborators,
    forward: Option<HistoryForward>,
}

struct WeakSmallOps {
    bus: WeakEventBus,
    store: StateStore,
    host: Collaborators,
    forward: Option<HistoryForward>,
}

impl WeakSmallOps {
    fn upgrade(&self) -> Option<SmallOperationsManager> {
        self.bus.upgrade().map(|bus| SmallOperationsManager {
            bus,
            store: self.store.clone(),
            host: self.host.clone(),
            forward: self.forward.clone(),
        })
    }
}

impl SmallOperationsManager {
    pub fn new(bus: EventBus, store: StateStore, host: Collaborators) -> Self {
        Self {
            bus,
            store,
            host,
            forward: None,
        }
    }

    /// Route undo/redo requests to `forward`
    pub fn with_history_forward(mut self, forward: HistoryForward) -> Self {
        self.forward = Some(forward);
        self
    }

    fn weak(&self) -> WeakSmallOps {
        WeakSmallOps {
            bus: self.bus.downgrade(),
            store: self.store.clone(),
            host: self.host.clone(),
            forward: self.forward.clone(),
        }
    }

    /// Subscribe to the toolbar topics
    pub fn attach(&self) {
        let handle = self.weak();
        self.bus
            .on_with_owner(topics::DUPLICATE_REQUESTED, SMALL_OPS_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.duplicate();
                }
                Ok(())
            });

        let handle = self.weak();
        self.bus
            .on_with_owner(topics::UNDO_REQUESTED, SMALL_OPS_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.forward_history(HistoryDirection::Undo);
                }
                Ok(())
            });

        let handle = self.weak();
        self.bus
            .on_with_owner(topics::REDO_REQUESTED, SMALL_OPS_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.forward_history(HistoryDirection::Redo);
                }
                Ok(())
            });

        let handle = self.weak();
        self.bus
            .on_with_owner(topics::RESET_REQUESTED, SMALL_OPS_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.reset();
                }
                Ok(())
            });

        debug!("Small operations manager attached");
    }

    /// Remove the manager's listeners; returns how many were removed
    pub fn detach(&self) -> usize {
        self.bus.remove_all_listeners_for_owner(SMALL_OPS_OWNER)
    }

    pub fn duplicate(&self) {
        let language = self.host.language;
        debug!("Duplicate requested");
        self.host.notifications.notify(
            language.pick("复制功能即将推出", "Duplicate is coming soon"),
            NotificationKind::Info,
        );
    }

    fn forward_history(&self, direction: HistoryDirection) {
        match &self.forward {
            Some(forward) => forward(direction),
            None => debug!(?direction, "No editor attached for history request"),
        }
    }

    /// Replace the diagram with a blank of the same type
    ///
    /// Returns true when the reset went through.
    pub fn reset(&self) -> bool {
        let language = self.host.language;
        let Some(diagram_type) = self.store.diagram_type() else {
            warn!("Reset requested with no active diagram");
            self.host.notifications.notify(
                language.pick("没有可重置的图表", "There is no diagram to reset"),
                NotificationKind::Warning,
            );
            return false;
        };

        let question = language.pick(
            "确定要重置画布吗？此操作无法撤销。",
            "Reset the canvas? This cannot be undone.",
        );
        if !self.host.prompt.confirm(question) {
            debug!(diagram_type = %diagram_type, "Reset declined");
            return false;
        }

        let blank = self.host.templates.blank(diagram_type, language);
        self.store.set_diagram(blank.clone());
        self.host.render_or_notify(&blank);

        self.bus.emit(EditorEvent::HistoryClearRequested);
        self.bus.emit(EditorEvent::completed("reset", &blank));

        if self.store.clear_selection() {
            self.bus.emit(EditorEvent::SelectionCleared);
        }
        info!(diagram_type = %diagram_type, "Diagram reset to blank template");
        true
    }
}

impl std::fmt::Debug for SmallOperationsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmallOperationsManager")
            .field("host", &self.host)
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagramType, HistoryConfig, HistoryManager, Language};
    use crate::editor::host::{FixedAnswer, NotificationSink};
    use crate::editor::blank_template;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, NotificationKind)>>);

    impl NotificationSink for Recorder {
        fn notify(&self, message: &str, kind: NotificationKind) {
            self.0.lock().unwrap().push((message.to_string(), kind));
        }
    }

    fn setup(confirm: bool) -> (EventBus, StateStore, Arc<Recorder>, SmallOperationsManager) {
        let bus = EventBus::new();
        let store = StateStore::new();
        let recorder = Arc::new(Recorder::default());
        let host = Collaborators::headless(Language::En)
            .with_notifications(recorder.clone())
            .with_prompt(Arc::new(FixedAnswer(confirm)));
        let manager = SmallOperationsManager::new(bus.clone(), store.clone(), host);
        manager.attach();
        (bus, store, recorder, manager)
    }

    #[test]
    fn test_duplicate_notifies() {
        let (bus, _, recorder, _manager) = setup(true);
        bus.emit(EditorEvent::DuplicateRequested);
        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("coming soon"));
    }

    #[test]
    fn test_reset_replaces_spec_and_clears_history() {
        let (bus, store, _, _manager) = setup(true);
        let history = HistoryManager::attached(bus.clone(), &HistoryConfig::default());

        let mut spec = blank_template(DiagramType::FlowMap, Language::En);
        spec.body.list_mut("steps").unwrap().push_placeholder("Boil water");
        store.set_diagram(spec.clone());
        store.set_selection(vec!["step-0".into()]);
        bus.emit(EditorEvent::completed("add_node", &spec));
        bus.emit(EditorEvent::completed("add_node", &spec));
        assert_eq!(history.status().history_size, 2);

        bus.emit(EditorEvent::ResetRequested);

        let state = store.get_diagram_state();
        assert_eq!(
            state.spec,
            Some(blank_template(DiagramType::FlowMap, Language::En))
        );
        assert!(state.selected_nodes.is_empty());
        // cleared, then the reset snapshot becomes the baseline
        assert_eq!(history.status().history_size, 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_declined_reset_keeps_spec() {
        let (bus, store, _, _manager) = setup(false);
        let mut spec = blank_template(DiagramType::CircleMap, Language::En);
        spec.body.list_mut("context").unwrap().push_placeholder("Rain");
        store.set_diagram(spec.clone());
        bus.emit(EditorEvent::ResetRequested);
        assert_eq!(store.get_diagram_state().spec, Some(spec));
    }

    #[test]
    fn test_reset_without_diagram_warns() {
        let (_, _, recorder, manager) = setup(true);
        assert!(!manager.reset());
        assert_eq!(recorder.0.lock().unwrap()[0].1, NotificationKind::Warning);
    }

    #[test]
    fn test_history_requests_forwarded() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let manager = SmallOperationsManager::new(
            bus.clone(),
            StateStore::new(),
            Collaborators::headless(Language::En),
        )
        .with_history_forward(Arc::new(move |direction| sink.lock().unwrap().push(direction)));
        manager.attach();

        bus.emit(EditorEvent::UndoRequested);
        bus.emit(EditorEvent::RedoRequested);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![HistoryDirection::Undo, HistoryDirection::Redo]
        );
        assert_eq!(manager.detach(), 4);
    }
}
