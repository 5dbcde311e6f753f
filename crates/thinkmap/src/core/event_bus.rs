//! Topic-based publish/subscribe hub with owner-scoped teardown
//!
//! Emission is synchronous: [`EventBus::emit`] returns after every
//! subscriber of the topic has run, in subscription order. The registry lock
//! is released before handlers run, so a handler may emit (the inner
//! emission sees the subscriber set as it is at that moment) or subscribe.
//!
//! A handler returning `Err` or panicking is logged and skipped; the
//! remaining handlers still run.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{error, trace, warn};

use super::error::EditorError;
use super::events::EditorEvent;

/// Identifies the component that owns a set of listeners
pub type OwnerId = String;

/// Handle returned by `on`, used to unsubscribe one listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&EditorEvent) -> anyhow::Result<()> + Send + Sync>;

struct Listener {
    id: ListenerId,
    owner: Option<OwnerId>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    /// topic → listeners in subscription order
    topics: HashMap<String, Vec<Arc<Listener>>>,
    /// owner → (topic, listener) pairs, for one-call teardown
    owners: HashMap<OwnerId, Vec<(String, ListenerId)>>,
    next_id: u64,
}

/// Process-wide event hub; cloning yields another handle to the same hub
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock();
        f.debug_struct("EventBus")
            .field("topics", &registry.topics.len())
            .field("owners", &registry.owners.len())
            .finish()
    }
}

/// Non-owning handle; listeners capture this to avoid keeping the hub alive
#[derive(Clone, Default)]
pub struct WeakEventBus {
    registry: Weak<Mutex<Registry>>,
}

impl WeakEventBus {
    pub fn upgrade(&self) -> Option<EventBus> {
        self.registry.upgrade().map(|registry| EventBus { registry })
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe without an owner
    pub fn on<F>(&self, topic: &str, handler: F) -> ListenerId
    where
        F: Fn(&EditorEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(topic, None, Arc::new(handler))
    }

    /// Subscribe on behalf of `owner`; see [`EventBus::remove_all_listeners_for_owner`]
    pub fn on_with_owner<F>(&self, topic: &str, owner: &str, handler: F) -> ListenerId
    where
        F: Fn(&EditorEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(topic, Some(owner.to_string()), Arc::new(handler))
    }

    fn register(&self, topic: &str, owner: Option<OwnerId>, handler: Handler) -> ListenerId {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);

        if let Some(owner) = &owner {
            registry
                .owners
                .entry(owner.clone())
                .or_default()
                .push((topic.to_string(), id));
        }
        registry
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(Arc::new(Listener { id, owner, handler }));

        trace!(topic, listener = id.0, "Listener registered");
        id
    }

    /// Remove one listener; returns false when it was not subscribed to `topic`
    pub fn off(&self, topic: &str, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let Some(listeners) = registry.topics.get_mut(topic) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|l| l.id == id) else {
            return false;
        };
        let removed = listeners.remove(position);
        if listeners.is_empty() {
            registry.topics.remove(topic);
        }

        if let Some(owner) = &removed.owner {
            if let Some(entries) = registry.owners.get_mut(owner) {
                entries.retain(|(_, listener)| *listener != id);
                if entries.is_empty() {
                    registry.owners.remove(owner);
                }
            }
        }
        trace!(topic, listener = id.0, "Listener removed");
        true
    }

    /// Remove every listener registered by `owner`; returns how many were removed
    pub fn remove_all_listeners_for_owner(&self, owner: &str) -> usize {
        let mut registry = self.lock();
        let Some(entries) = registry.owners.remove(owner) else {
            return 0;
        };

        let mut removed = 0;
        for (topic, id) in entries {
            if let Some(listeners) = registry.topics.get_mut(&topic) {
                let before = listeners.len();
                listeners.retain(|l| l.id != id);
                removed += before - listeners.len();
                if listeners.is_empty() {
                    registry.topics.remove(&topic);
                }
            }
        }
        trace!(owner, removed, "Owner listeners removed");
        removed
    }

    /// Deliver `event` to every current subscriber of its topic
    ///
    /// Returns the number of handlers that completed without error.
    pub fn emit(&self, event: EditorEvent) -> usize {
        let topic = event.topic().to_string();
        let snapshot: Vec<Arc<Listener>> = self
            .lock()
            .topics
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        trace!(topic = %topic, listeners = snapshot.len(), "Emitting event");

        let mut delivered = 0;
        for listener in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| (listener.handler)(&event)));
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    let fault = EditorError::MalformedEventPayload {
                        topic: topic.clone(),
                        message: e.to_string(),
                    };
                    error!(
                        topic = %topic,
                        listener = listener.id.0,
                        owner = listener.owner.as_deref().unwrap_or("-"),
                        error = %fault,
                        "Event listener failed"
                    );
                }
                Err(_) => {
                    error!(
                        topic = %topic,
                        listener = listener.id.0,
                        owner = listener.owner.as_deref().unwrap_or("-"),
                        "Event listener panicked"
                    );
                }
            }
        }
        delivered
    }

    /// Emit on a topic the kernel has no typed variant for
    pub fn emit_custom(&self, topic: &str, payload: Value) -> usize {
        if topic.is_empty() {
            warn!("Refusing to emit on an empty topic");
            return 0;
        }
        self.emit(EditorEvent::Custom {
            topic: topic.to_string(),
            payload,
        })
    }

    /// Number of listeners on `topic`
    pub fn listener_count(&self, topic: &str) -> usize {
        self.lock().topics.get(topic).map_or(0, Vec::len)
    }

    /// Number of listeners registered by `owner`
    pub fn owner_listener_count(&self, owner: &str) -> usize {
        self.lock().owners.get(owner).map_or(0, Vec::len)
    }

    /// Topics with at least one listener, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.lock().topics.keys().cloned().collect();
        topics.sort();
        topics
    }
}
