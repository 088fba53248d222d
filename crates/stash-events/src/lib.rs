//! Stash Events
//!
//! Two notification channels reach a storage subscriber:
//! - change events, published by a facade on every mutation within its own context
//! - native storage events, delivered by the host when another context mutates
//!   the shared storage area
//!
//! Both travel over an [`EventBus`] keyed by topic strings.

mod bus;
mod event;

pub use bus::{EventBus, ListenerId};
pub use event::{AreaId, ChangeEvent, Event, StorageEvent, STORAGE_TOPIC};
