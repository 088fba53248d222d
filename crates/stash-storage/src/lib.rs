//! Stash Storage Layer
//!
//! Host key-value stores behind the `KeyValueStore` trait.
//! Values are plain text; JSON framing belongs to the facade in `stash-core`.

mod error;
mod memory;
mod migrations;
mod sqlite;
mod store;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{entry_size, KeyValueStore, DEFAULT_QUOTA_BYTES};

pub type Result<T> = std::result::Result<T, StorageError>;
