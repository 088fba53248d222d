//! Topic-keyed event bus
//!
//! Dispatch is synchronous: `publish` invokes every handler inline before it
//! returns. The handler list is snapshotted first and no lock is held while
//! handlers run, so a handler may publish, subscribe or unsubscribe itself.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::event::Event;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct EventBus {
    /// Handlers per topic, in registration order
    listeners: Arc<RwLock<HashMap<String, Vec<(ListenerId, Handler)>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe<F>(&self, topic: &str, handler: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        self.listeners
            .write()
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::trace!(topic = %topic, listener_id = %id, "Added listener");

        id
    }

    /// Remove a listener. Returns false if it was not registered on `topic`.
    pub fn unsubscribe(&self, topic: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(handlers) = listeners.get_mut(topic) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(listener_id, _)| *listener_id != id);
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            listeners.remove(topic);
        }

        if removed {
            tracing::trace!(topic = %topic, listener_id = %id, "Removed listener");
        }

        removed
    }

    /// Invoke every handler registered on `topic`. Returns how many ran.
    pub fn publish(&self, topic: &str, event: &Event) -> usize {
        let handlers: Vec<Handler> = match self.listeners.read().get(topic) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        for handler in &handlers {
            handler(event);
        }

        handlers.len()
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners.read().get(topic).map_or(0, Vec::len)
    }

    /// True if both handles refer to the same bus
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.listeners, &other.listeners)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let topics: Vec<String> = self.listeners.read().keys().cloned().collect();
        f.debug_struct("EventBus").field("topics", &topics).finish()
    }
}
