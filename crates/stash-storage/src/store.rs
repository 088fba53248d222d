//! Host key-value store abstraction

use crate::Result;

/// Browsers grant roughly 5 MiB of local storage per origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// A synchronous, text-only key-value store shared by every context of an origin.
///
/// Implementations must be usable from several facades at once, hence `Send + Sync`
/// with interior mutability.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw text stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Fails with [`StorageError::QuotaExceeded`](crate::StorageError::QuotaExceeded)
    /// when the write would push the store over its quota. A failed write leaves
    /// the previous value in place.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Returns the previous value, if any.
    fn remove_item(&self, key: &str) -> Result<Option<String>>;

    /// Delete every key
    fn clear(&self) -> Result<()>;

    /// All keys currently stored, in no particular order
    fn keys(&self) -> Result<Vec<String>>;

    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Bytes counted against the quota
    fn usage_bytes(&self) -> Result<usize>;
}

/// Size of one entry as counted against the quota
pub fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
