//! Undo/redo of whole-spec snapshots
//!
//! [`HistoryStack`] is the pure cursor-over-snapshots structure;
//! [`HistoryManager`] wires it to the event bus:
//!
//! | listens to | action |
//! |---|---|
//! | `diagram:operation_completed` | [`HistoryManager::save_to_history`] |
//! | `history:undo_requested` | [`HistoryManager::undo`] |
//! | `history:redo_requested` | [`HistoryManager::redo`] |
//! | `history:clear_requested` | [`HistoryManager::clear`] |

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::clock::now_ms;
use super::config::HistoryConfig;
use super::event_bus::{EventBus, WeakEventBus};
use super::events::{topics, EditorEvent, HistoryRestore, HistoryStatus};
use super::spec::DiagramSpec;

/// Owner tag for the manager's bus listeners
pub const HISTORY_OWNER: &str = "history_manager";

/// One recorded snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub action: String,
    pub metadata: Value,
    pub spec: DiagramSpec,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// Bounded, branch-cut stack of snapshots with a cursor
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    /// Cursor; `None` while empty
    index: Option<usize>,
    max_size: usize,
}

impl HistoryStack {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            max_size: max_size.max(1),
        }
    }

    /// Record a snapshot after the cursor, discarding any redo tail
    pub fn push(&mut self, action: &str, metadata: Value, spec: &DiagramSpec) {
        let keep = self.index.map_or(0, |i| i + 1);
        if keep < self.entries.len() {
            trace!(discarded = self.entries.len() - keep, "Branch cut");
            self.entries.truncate(keep);
        }

        self.entries.push(HistoryEntry {
            action: action.to_string(),
            metadata,
            spec: spec.clone(),
            timestamp_ms: now_ms(),
        });
        let mut index = self.entries.len() - 1;

        if self.entries.len() > self.max_size {
            self.entries.remove(0);
            index -= 1;
        }
        self.index = Some(index);
    }

    /// Step back; `None` when already at the oldest entry
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        match self.index {
            Some(i) if i > 0 => {
                self.index = Some(i - 1);
                self.entries.get(i - 1)
            }
            _ => None,
        }
    }

    /// Step forward; `None` when already at the newest entry
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        match self.index {
            Some(i) if i + 1 < self.entries.len() => {
                self.index = Some(i + 1);
                self.entries.get(i + 1)
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.index.and_then(|i| self.entries.get(i))
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            history_size: self.entries.len(),
            history_index: self.index,
        }
    }

    fn restore_payload(&self, entry: &HistoryEntry) -> HistoryRestore {
        HistoryRestore {
            action: entry.action.clone(),
            metadata: entry.metadata.clone(),
            spec: entry.spec.clone(),
            history_index: self.index.unwrap_or(0),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }
}

/// Bus-attached undo/redo manager
///
/// Events are emitted after the stack lock is released, so listeners may
/// query the manager from inside their handlers.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    stack: Arc<Mutex<HistoryStack>>,
    bus: EventBus,
}

struct WeakHistory {
    stack: Arc<Mutex<HistoryStack>>,
    bus: WeakEventBus,
}

impl WeakHistory {
    fn upgrade(&self) -> Option<HistoryManager> {
        self.bus.upgrade().map(|bus| HistoryManager {
            stack: Arc::clone(&self.stack),
            bus,
        })
    }
}

impl HistoryManager {
    pub fn new(bus: EventBus, config: &HistoryConfig) -> Self {
        Self {
            stack: Arc::new(Mutex::new(HistoryStack::new(config.max_history_size))),
            bus,
        }
    }

    /// Create and subscribe to the bus in one step
    pub fn attached(bus: EventBus, config: &HistoryConfig) -> Self {
        let manager = Self::new(bus, config);
        manager.attach();
        manager
    }

    fn lock(&self) -> MutexGuard<'_, HistoryStack> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn weak(&self) -> WeakHistory {
        WeakHistory {
            stack: Arc::clone(&self.stack),
            bus: self.bus.downgrade(),
        }
    }

    /// Subscribe to the history and operation topics
    pub fn attach(&self) {
        let handle = self.weak();
        self.bus
            .on_with_owner(topics::OPERATION_COMPLETED, HISTORY_OWNER, move |event| {
                if let (
                    Some(manager),
                    EditorEvent::OperationCompleted {
                        operation,
                        snapshot,
                        data,
                    },
                ) = (handle.upgrade(), event)
                {
                    let metadata = data.clone().unwrap_or(Value::Null);
                    manager.save_to_history(operation, metadata, snapshot.as_ref());
                }
                Ok(())
            });

        let handle = self.weak();
        self.bus
            .on_with_owner(topics::UNDO_REQUESTED, HISTORY_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.undo();
                }
                Ok(())
            });

        let handle = self.weak();
        self.bus
            .on_with_owner(topics::REDO_REQUESTED, HISTORY_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.redo();
                }
                Ok(())
            });

        let handle = self.weak();
        self.bus
            .on_with_owner(topics::CLEAR_REQUESTED, HISTORY_OWNER, move |_| {
                if let Some(manager) = handle.upgrade() {
                    manager.clear();
                }
                Ok(())
            });

        debug!("History manager attached");
    }

    /// Remove the manager's listeners; returns how many were removed
    pub fn detach(&self) -> usize {
        self.bus.remove_all_listeners_for_owner(HISTORY_OWNER)
    }

    /// Record a snapshot; a missing spec is warned and dropped
    pub fn save_to_history(&self, action: &str, metadata: Value, spec: Option<&DiagramSpec>) {
        let Some(spec) = spec else {
            warn!(action, "No spec provided to history; snapshot dropped");
            return;
        };

        let (saved, status) = {
            let mut stack = self.lock();
            stack.push(action, metadata, spec);
            let status = stack.status();
            let saved = EditorEvent::HistorySaved {
                action: action.to_string(),
                history_index: status.history_index.unwrap_or(0),
                history_size: status.history_size,
            };
            (saved, status)
        };

        debug!(
            action,
            history_index = ?status.history_index,
            history_size = status.history_size,
            "Saved to history"
        );
        self.bus.emit(saved);
        self.bus.emit(EditorEvent::HistoryStateChanged(status));
    }

    /// Move the cursor back and broadcast the restored spec
    pub fn undo(&self) -> Option<DiagramSpec> {
        let (outcome, status) = {
            let mut stack = self.lock();
            let restored = stack.undo().cloned();
            let outcome = restored.map(|entry| stack.restore_payload(&entry));
            (outcome, stack.status())
        };

        match outcome {
            Some(restore) => {
                debug!(action = %restore.action, history_index = restore.history_index, "Undo");
                let spec = restore.spec.clone();
                self.bus.emit(EditorEvent::UndoCompleted(restore));
                self.bus.emit(EditorEvent::HistoryStateChanged(status));
                Some(spec)
            }
            None => {
                debug!("Nothing to undo");
                self.bus.emit(EditorEvent::UndoFailed {
                    reason: "Nothing to undo".to_string(),
                });
                None
            }
        }
    }

    /// Move the cursor forward and broadcast the restored spec
    pub fn redo(&self) -> Option<DiagramSpec> {
        let (outcome, status) = {
            let mut stack = self.lock();
            let restored = stack.redo().cloned();
            let outcome = restored.map(|entry| stack.restore_payload(&entry));
            (outcome, stack.status())
        };

        match outcome {
            Some(restore) => {
                debug!(action = %restore.action, history_index = restore.history_index, "Redo");
                let spec = restore.spec.clone();
                self.bus.emit(EditorEvent::RedoCompleted(restore));
                self.bus.emit(EditorEvent::HistoryStateChanged(status));
                Some(spec)
            }
            None => {
                debug!("Nothing to redo");
                self.bus.emit(EditorEvent::RedoFailed {
                    reason: "Nothing to redo".to_string(),
                });
                None
            }
        }
    }

    pub fn clear(&self) {
        let status = {
            let mut stack = self.lock();
            stack.clear();
            stack.status()
        };
        debug!("History cleared");
        self.bus.emit(EditorEvent::HistoryCleared);
        self.bus.emit(EditorEvent::HistoryStateChanged(status));
    }

    pub fn can_undo(&self) -> bool {
        self.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().can_redo()
    }

    pub fn status(&self) -> HistoryStatus {
        self.lock().status()
    }

    /// Deep copies of every stored snapshot, oldest first
    pub fn snapshots(&self) -> Vec<DiagramSpec> {
        self.lock().entries().iter().map(|e| e.spec.clone()).collect()
    }

    /// Deep copy of the snapshot under the cursor
    pub fn current(&self) -> Option<DiagramSpec> {
        self.lock().current().map(|e| e.spec.clone())
    }
}
