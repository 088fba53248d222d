//! Subscription handles and watched key sets

use stash_events::{EventBus, ListenerId, STORAGE_TOPIC};

/// One or more keys a subscriber is interested in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchKeys(Vec<String>);

impl WatchKeys {
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for WatchKeys {
    fn from(key: &str) -> Self {
        Self(vec![key.to_string()])
    }
}

impl From<String> for WatchKeys {
    fn from(key: String) -> Self {
        Self(vec![key])
    }
}

impl From<&String> for WatchKeys {
    fn from(key: &String) -> Self {
        Self(vec![key.clone()])
    }
}

impl From<Vec<String>> for WatchKeys {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<Vec<&str>> for WatchKeys {
    fn from(keys: Vec<&str>) -> Self {
        Self(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for WatchKeys {
    fn from(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for WatchKeys {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Disposer for a storage subscription.
///
/// Holds the two listeners registered by `Storage::subscribe`, one on the
/// change topic and one on the native storage topic. Dropping the handle
/// removes both; use [`Subscription::forget`] to keep them for the lifetime
/// of the bus.
#[must_use = "dropping a Subscription removes its listeners"]
pub struct Subscription {
    bus: EventBus,
    change_topic: String,
    change_listener: Option<ListenerId>,
    storage_listener: Option<ListenerId>,
}

impl Subscription {
    pub(crate) fn new(
        bus: EventBus,
        change_topic: String,
        change_listener: ListenerId,
        storage_listener: ListenerId,
    ) -> Self {
        Self {
            bus,
            change_topic,
            change_listener: Some(change_listener),
            storage_listener: Some(storage_listener),
        }
    }

    /// Remove both listeners. Returns false if either was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.dispose()
    }

    /// Keep both listeners registered without holding the handle
    pub fn forget(mut self) {
        self.change_listener = None;
        self.storage_listener = None;
    }

    pub fn is_active(&self) -> bool {
        self.change_listener.is_some() || self.storage_listener.is_some()
    }

    fn dispose(&mut self) -> bool {
        // Two independent steps: a missing change listener must not keep the
        // storage listener alive
        let change_removed = match self.change_listener.take() {
            Some(id) => self.bus.unsubscribe(&self.change_topic, id),
            None => false,
        };
        let storage_removed = match self.storage_listener.take() {
            Some(id) => self.bus.unsubscribe(STORAGE_TOPIC, id),
            None => false,
        };

        change_removed && storage_removed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.is_active() {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("change_topic", &self.change_topic)
            .field("change_listener", &self.change_listener)
            .field("storage_listener", &self.storage_listener)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_keys_conversions() {
        let single: WatchKeys = "a".into();
        assert!(single.contains("a"));
        assert!(!single.contains("b"));

        let many: WatchKeys = ["a", "b"].into();
        assert_eq!(many.iter().collect::<Vec<_>>(), vec!["a", "b"]);

        let owned: WatchKeys = vec!["c".to_string()].into();
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn test_dispose_removes_both_listeners() {
        let bus = EventBus::new();
        let change = bus.subscribe("t", |_| {});
        let storage = bus.subscribe(STORAGE_TOPIC, |_| {});

        let subscription = Subscription::new(bus.clone(), "t".to_string(), change, storage);
        assert!(subscription.unsubscribe());
        assert_eq!(bus.listener_count("t"), 0);
        assert_eq!(bus.listener_count(STORAGE_TOPIC), 0);
    }

    #[test]
    fn test_partial_dispose_still_removes_other_listener() {
        let bus = EventBus::new();
        let change = bus.subscribe("t", |_| {});
        let storage = bus.subscribe(STORAGE_TOPIC, |_| {});
        bus.unsubscribe("t", change);

        let subscription = Subscription::new(bus.clone(), "t".to_string(), change, storage);
        assert!(!subscription.unsubscribe());
        assert_eq!(bus.listener_count(STORAGE_TOPIC), 0);
    }

    #[test]
    fn test_drop_and_forget() {
        let bus = EventBus::new();
        {
            let change = bus.subscribe("t", |_| {});
            let storage = bus.subscribe(STORAGE_TOPIC, |_| {});
            let _subscription = Subscription::new(bus.clone(), "t".to_string(), change, storage);
        }
        assert_eq!(bus.listener_count("t"), 0);

        let change = bus.subscribe("t", |_| {});
        let storage = bus.subscribe(STORAGE_TOPIC, |_| {});
        Subscription::new(bus.clone(), "t".to_string(), change, storage).forget();
        assert_eq!(bus.listener_count("t"), 1);
        assert_eq!(bus.listener_count(STORAGE_TOPIC), 1);
    }
}
