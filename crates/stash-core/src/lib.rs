//! Stash Core
//!
//! A JSON storage facade over a host key-value store:
//! - values are framed as JSON text
//! - optional TTL envelopes, checked on read
//! - an in-memory fallback when the host store refuses a write
//! - change notification within a context, plus native storage events
//!   from other contexts sharing the same area

mod area;
mod config;
mod error;
pub mod json;
mod storage;
mod subscription;
mod time;
pub mod ttl;

pub use area::{AreaContext, StorageArea};
pub use config::Config;
pub use error::CoreError;
pub use storage::Storage;
pub use subscription::{Subscription, WatchKeys};
pub use time::{Clock, ManualClock, SystemClock};
pub use ttl::TtlEnvelope;

// Re-export collaborators
pub use stash_events::{AreaId, ChangeEvent, Event, EventBus, ListenerId, StorageEvent};
pub use stash_storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A host application may already have installed a subscriber
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
