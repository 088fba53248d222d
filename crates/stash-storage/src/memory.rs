//! In-memory store
//!
//! Behaves like a browser origin's local storage: text values, a byte quota,
//! and optionally disabled writes.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StorageError;
use crate::store::{entry_size, KeyValueStore, DEFAULT_QUOTA_BYTES};
use crate::Result;

pub struct MemoryStore {
    items: Arc<RwLock<HashMap<String, String>>>,
    /// Byte quota, `None` for unlimited
    quota: Option<usize>,
    /// Reject every write, as when the user turns storage off
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_quota(Some(DEFAULT_QUOTA_BYTES))
    }

    pub fn with_quota(quota: Option<usize>) -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            quota,
            disabled: false,
        }
    }

    pub fn unlimited() -> Self {
        Self::with_quota(None)
    }

    /// A store that refuses every write
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::new()
        }
    }

    pub fn quota(&self) -> Option<usize> {
        self.quota
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.disabled {
            return Err(StorageError::Disabled);
        }

        let mut items = self.items.write();

        if let Some(quota) = self.quota {
            let current: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_size(k, v))
                .sum();
            let requested = current + entry_size(key, value);
            if requested > quota {
                tracing::debug!(key = %key, requested, quota, "Write rejected by quota");
                return Err(StorageError::QuotaExceeded { requested, quota });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.write().remove(key))
    }

    fn clear(&self) -> Result<()> {
        self.items.write().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.items.read().len())
    }

    fn usage_bytes(&self) -> Result<usize> {
        Ok(self
            .items
            .read()
            .iter()
            .map(|(k, v)| entry_size(k, v))
            .sum())
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            quota: self.quota,
            disabled: self.disabled,
        }
    }
}
