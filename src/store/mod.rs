//! # Shared Key-Value Store
//!
//! The communication medium between sibling execution contexts. A write in
//! one context is observable by every subscribed context of the same store,
//! mirroring browser `localStorage` plus its `storage` event.
//!
//! The timer protocol never relies on cross-key transactions: every message
//! is a single-key snapshot overwrite, and acceptance is timestamp-gated by
//! the consumer. Any backing store that can notify readers on key writes
//! satisfies the [`SharedStore`] contract; [`MemoryStore`] is the in-process
//! implementation used in production wiring and tests alike.
//!
//! Note: unlike the browser `storage` event, [`MemoryStore`] also delivers a
//! write back to the writer's own context. Consumers tolerate self-delivery;
//! applying one's own fresh timer envelope is a no-op by value.

pub mod keys;

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Capacity of the notification channel. Slow subscribers that fall further
/// behind than this observe a `Lagged` error and simply miss old events,
/// which the timer protocol absorbs (last writer wins anyway).
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification emitted on every store write or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    /// Key that changed
    pub key: String,
    /// New value, `None` on removal
    pub value: Option<String>,
}

/// A key-value store whose writes are observable by sibling contexts.
pub trait SharedStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, notifying all subscribers.
    fn set(&self, key: &str, value: &str);

    /// Remove a value, notifying all subscribers.
    fn remove(&self, key: &str);

    /// Snapshot of all present keys.
    fn keys(&self) -> Vec<String>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// In-process shared store with write notifications.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> T {
        // Recover from poisoning: the map itself is always left consistent
        // because mutations are single insert/remove calls.
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn notify(&self, key: &str, value: Option<&str>) {
        // Send fails only when no subscriber exists, which is fine.
        let _ = self.events.send(StoreEvent {
            key: key.to_string(),
            value: value.map(str::to_string),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
        self.notify(key, Some(value));
    }

    fn remove(&self, key: &str) {
        let removed = self.with_entries(|entries| entries.remove(key));
        if removed.is_some() {
            self.notify(key, None);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.with_entries(|entries| entries.keys().cloned().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
