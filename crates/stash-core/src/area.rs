//! Shared storage areas
//!
//! Several contexts (tabs, windows, workers) may attach to one area. Each
//! context has its own event bus; when one context mutates the area, every
//! *other* attached context receives a native [`StorageEvent`] on
//! [`STORAGE_TOPIC`]. The originating context is never notified this way.

use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use stash_events::{AreaId, Event, EventBus, StorageEvent, STORAGE_TOPIC};
use stash_storage::KeyValueStore;

use crate::Result;

pub struct StorageArea {
    id: AreaId,
    store: Arc<dyn KeyValueStore>,
    /// Attached contexts and their buses
    contexts: Arc<RwLock<Vec<(Uuid, EventBus)>>>,
}

impl StorageArea {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            id: AreaId::new(),
            store,
            contexts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn from_store<S: KeyValueStore + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    pub fn id(&self) -> AreaId {
        self.id
    }

    /// Attach a new context that publishes and listens on `bus`
    pub fn attach(&self, bus: EventBus) -> AreaContext {
        let context_id = Uuid::new_v4();
        self.contexts.write().push((context_id, bus.clone()));

        tracing::debug!(area_id = %self.id, context_id = %context_id, "Attached context");

        AreaContext {
            id: context_id,
            area: self.clone(),
            bus,
        }
    }

    pub fn context_count(&self) -> usize {
        self.contexts.read().len()
    }

    fn detach(&self, context_id: Uuid) {
        self.contexts.write().retain(|(id, _)| *id != context_id);
        tracing::debug!(area_id = %self.id, context_id = %context_id, "Detached context");
    }

    /// Deliver `event` to every context except `origin`
    fn broadcast(&self, origin: Uuid, event: StorageEvent) {
        let peers: Vec<EventBus> = self
            .contexts
            .read()
            .iter()
            .filter(|(id, _)| *id != origin)
            .map(|(_, bus)| bus.clone())
            .collect();

        if peers.is_empty() {
            return;
        }

        let event = Event::Storage(event);
        for bus in peers {
            bus.publish(STORAGE_TOPIC, &event);
        }
    }
}

impl Clone for StorageArea {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            store: Arc::clone(&self.store),
            contexts: Arc::clone(&self.contexts),
        }
    }
}

/// One context's view of a [`StorageArea`]. Detaches when dropped.
pub struct AreaContext {
    id: Uuid,
    area: StorageArea,
    bus: EventBus,
}

impl AreaContext {
    pub fn area_id(&self) -> AreaId {
        self.area.id
    }

    pub fn area(&self) -> &StorageArea {
        &self.area
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.area.store.get_item(key)?)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let old_value = self.area.store.get_item(key)?;
        self.area.store.set_item(key, value)?;

        self.area.broadcast(
            self.id,
            StorageEvent {
                key: Some(key.to_string()),
                old_value,
                new_value: Some(value.to_string()),
                storage_area: self.area.id,
            },
        );

        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<Option<String>> {
        let old_value = self.area.store.remove_item(key)?;

        if old_value.is_some() {
            self.area.broadcast(
                self.id,
                StorageEvent {
                    key: Some(key.to_string()),
                    old_value: old_value.clone(),
                    new_value: None,
                    storage_area: self.area.id,
                },
            );
        }

        Ok(old_value)
    }

    pub fn clear(&self) -> Result<()> {
        let was_empty = self.area.store.is_empty()?;
        self.area.store.clear()?;

        if !was_empty {
            self.area.broadcast(
                self.id,
                StorageEvent {
                    key: None,
                    old_value: None,
                    new_value: None,
                    storage_area: self.area.id,
                },
            );
        }

        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.area.store.keys()?)
    }
}

impl Drop for AreaContext {
    fn drop(&mut self) {
        self.area.detach(self.id);
    }
}
