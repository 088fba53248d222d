//! Storage facade
//!
//! JSON values over a host key-value store. No operation returns an error:
//! read failures come back as `None`, and a write the host store refuses is
//! held in an in-memory fallback cache, with `set` reporting `false`.
//! Every mutation publishes one [`ChangeEvent`] on the context's bus.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use stash_events::{AreaId, ChangeEvent, Event, EventBus, STORAGE_TOPIC};
use stash_storage::{MemoryStore, SqliteStore};

use crate::area::{AreaContext, StorageArea};
use crate::config::Config;
use crate::error::CoreError;
use crate::json::{parse_json, to_json_text};
use crate::subscription::{Subscription, WatchKeys};
use crate::time::{duration_ms, Clock, SystemClock};
use crate::ttl::{unwrap_value, TtlEnvelope, EXPIRY_FIELD, VALUE_FIELD};
use crate::Result;

struct Inner {
    context: AreaContext,
    config: Config,
    /// Change-event topic, derived once from the config
    topic: String,
    clock: Arc<dyn Clock>,
    /// Values whose persistent write failed, keyed by storage key
    fallback: Mutex<HashMap<String, Value>>,
}

/// One context's storage facade.
///
/// Construct one per context at startup and hand out clones; clones share the
/// fallback cache, the bus and the area.
pub struct Storage {
    inner: Arc<Inner>,
}

impl Storage {
    pub fn new(context: AreaContext, config: Config) -> Self {
        Self::with_clock(context, config, Arc::new(SystemClock))
    }

    pub fn with_clock(context: AreaContext, config: Config, clock: Arc<dyn Clock>) -> Self {
        let topic = config.event_topic();

        tracing::debug!(
            area_id = %context.area_id(),
            topic = %topic,
            "Created storage facade"
        );

        Self {
            inner: Arc::new(Inner {
                context,
                config,
                topic,
                clock,
                fallback: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// A facade over a private in-memory area
    pub fn in_memory(config: Config) -> Self {
        let area = StorageArea::from_store(MemoryStore::with_quota(config.quota_bytes));
        Self::new(area.attach(EventBus::new()), config)
    }

    /// A facade over the SQLite file named by `config.database_path`,
    /// or over memory when no path is configured
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let Some(path) = config.database_path.clone() else {
            return Ok(Self::in_memory(config));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::Config(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let store = SqliteStore::open(&path)?.with_quota(config.quota_bytes);
        let area = StorageArea::from_store(store);

        tracing::info!(path = %path.display(), "Opened SQLite storage");

        Ok(Self::new(area.attach(EventBus::new()), config))
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn area_id(&self) -> AreaId {
        self.inner.context.area_id()
    }

    /// The bus this facade publishes change events on
    pub fn bus(&self) -> &EventBus {
        self.inner.context.bus()
    }

    /// Read and deserialize `key`.
    ///
    /// `None` when the key is missing, holds `null`, holds malformed JSON, or
    /// does not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Stored value has unexpected shape");
                None
            }
        }
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        let held = self.inner.fallback.lock().get(key).cloned();
        if let Some(value) = held {
            return non_null(value);
        }

        let text = match self.inner.context.get_item(key) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read from storage");
                return None;
            }
        };

        parse_json(text.as_deref().unwrap_or("null")).and_then(non_null)
    }

    /// Serialize and store `value`. Returns true if the host store accepted it,
    /// false if it is only held in memory.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.set_value(key, Some(value)),
            Err(e) => {
                // Nothing representable to hold: drop any stale fallback so
                // reads see the store again
                tracing::warn!(key = %key, error = %e, "Failed to serialize value");
                self.inner.fallback.lock().remove(key);
                self.publish(key, None);
                false
            }
        }
    }

    /// Store a JSON value; `None` is written as the text `undefined`
    pub fn set_value(&self, key: &str, value: Option<Value>) -> bool {
        let persisted = match to_json_text(value.as_ref()) {
            Ok(text) => match self.inner.context.set_item(key, &text) {
                Ok(()) => {
                    self.inner.fallback.lock().remove(key);
                    true
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Write failed, holding value in memory");
                    self.hold(key, value.clone());
                    false
                }
            },
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode value, holding it in memory");
                self.hold(key, value.clone());
                false
            }
        };

        self.publish(key, unwrap_value(value));
        persisted
    }

    /// Delete `key` from memory and the host store. Missing keys are fine.
    pub fn remove(&self, key: &str) {
        self.inner.fallback.lock().remove(key);

        if let Err(e) = self.inner.context.remove_item(key) {
            tracing::warn!(key = %key, error = %e, "Failed to remove from storage");
        }

        self.publish(key, None);
    }

    /// Read a TTL entry, evicting it if it has expired or carries no usable expiry
    pub fn get_with_ttl<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value_with_ttl(key)?;
        serde_json::from_value(value).ok()
    }

    pub fn get_value_with_ttl(&self, key: &str) -> Option<Value> {
        let item = self.get_value(key)?;

        let expiry = item
            .get(EXPIRY_FIELD)
            .and_then(Value::as_f64)
            .filter(|expiry| *expiry != 0.0);
        let now = self.inner.clock.now_ms();

        match expiry {
            Some(expiry) if (now as f64) <= expiry => {
                item.get(VALUE_FIELD).cloned().and_then(non_null)
            }
            _ => {
                tracing::debug!(key = %key, "Evicting expired entry");
                self.remove(key);
                None
            }
        }
    }

    /// Store `value` wrapped in a TTL envelope expiring `ttl` from now
    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let expiry = self.inner.clock.now_ms().saturating_add(duration_ms(ttl));

        match serde_json::to_value(value)
            .and_then(|value| serde_json::to_value(TtlEnvelope::new(value, expiry)))
        {
            Ok(envelope) => self.set_value(key, Some(envelope)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize value");
                self.inner.fallback.lock().remove(key);
                self.publish(key, None);
                false
            }
        }
    }

    /// [`Storage::set_with_ttl`] with the configured default TTL
    pub fn set_with_default_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.inner.config.default_ttl())
    }

    /// Delete every key in the area and the fallback cache.
    /// Publishes one change event per removed key.
    pub fn clear(&self) {
        let keys = self.keys();

        self.inner.fallback.lock().clear();
        if let Err(e) = self.inner.context.clear() {
            tracing::warn!(error = %e, "Failed to clear storage");
        }

        for key in &keys {
            self.publish(key, None);
        }
    }

    /// Keys in the host store or held in memory, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys = match self.inner.context.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list storage keys");
                Vec::new()
            }
        };
        keys.extend(self.inner.fallback.lock().keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        if self.inner.fallback.lock().contains_key(key) {
            return true;
        }
        matches!(self.inner.context.get_item(key), Ok(Some(_)))
    }

    /// True if `key` is held only in the fallback cache
    pub fn is_held_in_memory(&self, key: &str) -> bool {
        self.inner.fallback.lock().contains_key(key)
    }

    /// Call `callback` whenever one of `keys` changes, either through this
    /// context or through another context sharing the area.
    ///
    /// The callback receives the new value with any TTL envelope stripped,
    /// `None` when the key was removed.
    pub fn subscribe<K, F>(&self, keys: K, callback: F) -> Subscription
    where
        K: Into<WatchKeys>,
        F: Fn(Option<Value>) + Send + Sync + 'static,
    {
        let keys = Arc::new(keys.into());
        let callback = Arc::new(callback);
        let bus = self.bus().clone();
        let topic = self.inner.topic.clone();

        tracing::debug!(keys = ?keys, topic = %topic, "Subscribing to storage changes");

        let change_listener = {
            let keys = Arc::clone(&keys);
            let callback = Arc::clone(&callback);
            bus.subscribe(&topic, move |event| {
                if let Event::Change(change) = event {
                    if keys.contains(&change.key) {
                        callback(change.value.clone());
                    }
                }
            })
        };

        let storage_listener = {
            let area_id = self.area_id();
            let facade: Weak<Inner> = Arc::downgrade(&self.inner);
            bus.subscribe(STORAGE_TOPIC, move |event| {
                let Event::Storage(storage) = event else {
                    return;
                };
                if storage.storage_area != area_id {
                    return;
                }
                let Some(key) = storage.key.as_deref() else {
                    return;
                };
                if !keys.contains(key) {
                    return;
                }

                let value = match storage.new_value.as_deref().filter(|text| !text.is_empty()) {
                    Some(text) => parse_json(text),
                    None => facade
                        .upgrade()
                        .and_then(|inner| Storage { inner }.get_value(key)),
                };
                callback(unwrap_value(value));
            })
        };

        Subscription::new(bus, topic, change_listener, storage_listener)
    }

    fn hold(&self, key: &str, value: Option<Value>) {
        let mut fallback = self.inner.fallback.lock();
        match value {
            Some(value) => {
                fallback.insert(key.to_string(), value);
            }
            None => {
                fallback.remove(key);
            }
        }
    }

    fn publish(&self, key: &str, value: Option<Value>) {
        let event = Event::Change(ChangeEvent::new(key, value));
        self.bus().publish(&self.inner.topic, &event);
    }
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("area_id", &self.area_id())
            .field("topic", &self.inner.topic)
            .field("held_in_memory", &self.inner.fallback.lock().len())
            .finish()
    }
}

fn non_null(value: Value) -> Option<Value> {
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}
