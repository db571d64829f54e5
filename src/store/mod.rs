//! Persisted key-value store shared between execution contexts
//!
//! One [`StoreHandle`] models one execution context (a "tab"). Handles
//! created through [`StoreHandle::fork`] share the same data and
//! persistence backend but carry a distinct context identity: a write made
//! through one handle notifies subscribers registered on every *other*
//! handle, never the writer's own. The writer is expected to have updated
//! its in-memory view synchronously, so re-applying its own change would be
//! a double-apply bug.

pub mod file;
pub mod memory;

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

pub use file::JsonFileBackend;
pub use memory::MemoryBackend;

/// Durable side of the store. Implementations only move the whole map in
/// and out; keying and notification live in [`StoreHandle`].
pub trait StoreBackend: Send {
    fn load(&mut self) -> io::Result<HashMap<String, Value>>;
    fn flush(&mut self, data: &HashMap<String, Value>) -> io::Result<()>;
}

/// Identifier returned by [`StoreHandle::subscribe`], usable to drop the
/// subscription later.
pub type SubscriptionId = u64;

type ChangeListener = Arc<dyn Fn(&str, Option<&Value>) + Send + Sync>;

struct ListenerEntry {
    id: SubscriptionId,
    context: u64,
    key: String,
    callback: ChangeListener,
}

struct Shared {
    data: RwLock<HashMap<String, Value>>,
    backend: Mutex<Box<dyn StoreBackend>>,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_context: AtomicU64,
    next_subscription: AtomicU64,
}

/// One execution context's view of the shared store
#[derive(Clone)]
pub struct StoreHandle {
    shared: Arc<Shared>,
    context: u64,
}

impl StoreHandle {
    fn with_backend(mut backend: Box<dyn StoreBackend>) -> io::Result<Self> {
        let data = backend.load()?;
        Ok(Self {
            shared: Arc::new(Shared {
                data: RwLock::new(data),
                backend: Mutex::new(backend),
                listeners: Mutex::new(Vec::new()),
                next_context: AtomicU64::new(1),
                next_subscription: AtomicU64::new(0),
            }),
            context: 0,
        })
    }

    /// Volatile store, used by tests and as the default backend.
    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBackend)).expect("memory backend cannot fail to load")
    }

    /// Store persisted to a single JSON file at `path`. Existing content is
    /// loaded eagerly; a missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_backend(Box::new(JsonFileBackend::new(path)))
    }

    /// A second handle over the same store with its own context identity,
    /// modeling another same-origin execution context.
    pub fn fork(&self) -> StoreHandle {
        StoreHandle {
            shared: Arc::clone(&self.shared),
            context: self.shared.next_context.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared
            .data
            .read()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    /// Write-through set. The in-memory map is updated synchronously;
    /// durable persistence is best-effort (a flush failure is logged, never
    /// surfaced). Subscribers in other contexts are notified before return.
    pub fn set(&self, key: &str, value: Value) {
        {
            let mut data = self.shared.data.write().expect("store lock poisoned");
            data.insert(key.to_string(), value.clone());
        }
        self.flush_best_effort();
        self.notify(key, Some(&value));
    }

    pub fn remove(&self, key: &str) {
        let existed = {
            let mut data = self.shared.data.write().expect("store lock poisoned");
            data.remove(key).is_some()
        };
        if existed {
            self.flush_best_effort();
            self.notify(key, None);
        }
    }

    /// Remove every key under `prefix`, notifying other contexts once per
    /// removed key. Backs the full application reset.
    pub fn clear_prefix(&self, prefix: &str) {
        let removed: Vec<String> = {
            let mut data = self.shared.data.write().expect("store lock poisoned");
            let keys: Vec<String> = data
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            for key in &keys {
                data.remove(key);
            }
            keys
        };
        if removed.is_empty() {
            return;
        }
        self.flush_best_effort();
        for key in &removed {
            self.notify(key, None);
        }
    }

    /// Register `callback` for external changes to `key`. Changes written
    /// through this same handle are never delivered here.
    pub fn subscribe(
        &self,
        key: &str,
        callback: impl Fn(&str, Option<&Value>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.shared.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.shared
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .push(ListenerEntry {
                id,
                context: self.context,
                key: key.to_string(),
                callback: Arc::new(callback),
            });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .retain(|l| l.id != id);
    }

    fn flush_best_effort(&self) {
        let data = self.shared.data.read().expect("store lock poisoned");
        let mut backend = self.shared.backend.lock().expect("backend lock poisoned");
        if let Err(err) = backend.flush(&data) {
            tracing::warn!("store flush failed, keeping in-memory state: {err}");
        }
    }

    fn notify(&self, key: &str, value: Option<&Value>) {
        // Snapshot matching callbacks first so no lock is held while user
        // code runs (a callback may re-enter the store).
        let callbacks: Vec<ChangeListener> = {
            let listeners = self.shared.listeners.lock().expect("listener lock poisoned");
            listeners
                .iter()
                .filter(|l| l.context != self.context && l.key == key)
                .map(|l| Arc::clone(&l.callback))
                .collect()
        };
        for callback in callbacks {
            callback(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_get_roundtrip() {
        let store = StoreHandle::in_memory();
        assert_eq!(store.get("ns:brands"), None);
        store.set("ns:brands", json!(["Dell"]));
        assert_eq!(store.get("ns:brands"), Some(json!(["Dell"])));
    }

    #[test]
    fn test_writer_does_not_observe_own_change() {
        let store = StoreHandle::in_memory();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        store.subscribe("ns:assets", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set("ns:assets", json!([]));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // A forked context's write does reach us
        store.fork().set("ns:assets", json!([1]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_last_writer_wins_across_contexts() {
        let a = StoreHandle::in_memory();
        let b = a.fork();
        a.set("ns:vendors", json!(["from-a"]));
        b.set("ns:vendors", json!(["from-b"]));
        assert_eq!(a.get("ns:vendors"), Some(json!(["from-b"])));
    }

    #[test]
    fn test_clear_prefix_notifies_removals() {
        let a = StoreHandle::in_memory();
        let b = a.fork();
        a.set("ns:assets", json!([1]));
        a.set("other:assets", json!([2]));

        let cleared = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cleared);
        b.subscribe("ns:assets", move |_, value| {
            if value.is_none() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        a.clear_prefix("ns:");
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
        assert_eq!(a.get("ns:assets"), None);
        assert_eq!(a.get("other:assets"), Some(json!([2])));
    }

    #[test]
    fn test_unsubscribe() {
        let a = StoreHandle::in_memory();
        let b = a.fork();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = b.subscribe("k", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        a.set("k", json!(1));
        b.unsubscribe(sub);
        a.set("k", json!(2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
