//! Event payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Topic on which the host delivers native storage events
pub const STORAGE_TOPIC: &str = "storage";

/// Identity of a shared storage area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaId(Uuid);

impl AreaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AreaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Published by a facade after every mutation in its own context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub key: String,
    /// Value after the mutation, already unwrapped from any TTL envelope.
    /// `None` when the key was removed.
    pub value: Option<Value>,
}

impl ChangeEvent {
    pub fn new(key: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Delivered by the host when another context mutates a shared storage area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Changed key, `None` when the whole area was cleared
    pub key: Option<String>,
    /// Raw text before the change
    pub old_value: Option<String>,
    /// Raw text after the change, `None` on removal
    pub new_value: Option<String>,
    /// Area the change happened in
    pub storage_area: AreaId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Change(ChangeEvent),
    Storage(StorageEvent),
}

impl Event {
    pub fn key(&self) -> Option<&str> {
        match self {
            Event::Change(change) => Some(change.key.as_str()),
            Event::Storage(storage) => storage.key.as_deref(),
        }
    }
}

impl From<ChangeEvent> for Event {
    fn from(event: ChangeEvent) -> Self {
        Event::Change(event)
    }
}

impl From<StorageEvent> for Event {
    fn from(event: StorageEvent) -> Self {
        Event::Storage(event)
    }
}
