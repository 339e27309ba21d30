//! Durable object emulation: keyed, process-lifetime, single-instance state.
//!
//! An instance is identified by (namespace, key). The first access for a
//! pair constructs fresh empty storage; every later access returns a handle
//! to the same instance, so callers get read-your-writes consistency within
//! the process. All operations against one instance are serialized behind a
//! per-instance async mutex; operations against different keys proceed
//! independently.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

type Entries = BTreeMap<String, Value>;

/// Registry of durable object instances across all namespaces.
///
/// A handle obtained for one namespace cannot address keys in another: the
/// instance map is keyed by the full (namespace, key) pair and handles carry
/// no namespace-level access.
pub struct DurableObjectRegistry {
    instances: StdMutex<BTreeMap<(String, String), Arc<Mutex<Entries>>>>,
}

impl DurableObjectRegistry {
    pub fn new() -> Self {
        Self {
            instances: StdMutex::new(BTreeMap::new()),
        }
    }

    /// Get the instance for (namespace, key), creating it on first access.
    pub fn get_or_create(&self, namespace: &str, key: &str) -> ObjectHandle {
        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        let cell = instances
            .entry((namespace.to_string(), key.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(BTreeMap::new())));
        ObjectHandle {
            cell: Arc::clone(cell),
        }
    }

    /// Number of instances created so far, across all namespaces.
    pub fn instance_count(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for DurableObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one durable object instance.
///
/// Cloning the handle does not clone the state: all clones address the same
/// instance.
#[derive(Clone)]
pub struct ObjectHandle {
    cell: Arc<Mutex<Entries>>,
}

impl ObjectHandle {
    /// Lock the instance and return a storage view over it.
    ///
    /// The guard holds the per-instance lock, so a read-modify-write
    /// sequence through one guard is a single critical section; a second
    /// operation against the same instance queues behind it.
    pub async fn storage(&self) -> StorageGuard<'_> {
        StorageGuard {
            entries: self.cell.lock().await,
        }
    }

    /// Read one entry, serialized with other operations on this instance.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.cell.lock().await.get(key).cloned()
    }

    /// Write one entry, serialized with other operations on this instance.
    pub async fn put(&self, key: &str, value: Value) {
        self.cell.lock().await.insert(key.to_string(), value);
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> bool {
        self.cell.lock().await.remove(key).is_some()
    }
}

/// Storage view over a locked durable object instance.
pub struct StorageGuard<'a> {
    entries: MutexGuard<'a, Entries>,
}

impl StorageGuard<'_> {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Entry keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn same_key_same_instance() {
        let registry = DurableObjectRegistry::new();

        let first = registry.get_or_create("scheduling", "default");
        first.put("flight:1", json!({"departure": "FRA"})).await;

        // A second access observes the first handle's mutation.
        let second = registry.get_or_create("scheduling", "default");
        assert_eq!(
            second.get("flight:1").await,
            Some(json!({"departure": "FRA"}))
        );
        assert_eq!(registry.instance_count(), 1);
    }

    #[tokio::test]
    async fn different_keys_are_isolated() {
        let registry = DurableObjectRegistry::new();

        let a = registry.get_or_create("scheduling", "a");
        let b = registry.get_or_create("scheduling", "b");
        a.put("k", json!(1)).await;

        assert_eq!(b.get("k").await, None);
        assert_eq!(registry.instance_count(), 2);
    }

    #[tokio::test]
    async fn namespaces_do_not_share_instances() {
        let registry = DurableObjectRegistry::new();

        let scheduling = registry.get_or_create("scheduling", "default");
        let reservation = registry.get_or_create("reservation", "default");
        scheduling.put("k", json!("scheduling")).await;

        assert_eq!(reservation.get("k").await, None);
    }

    #[tokio::test]
    async fn storage_guard_is_one_critical_section() {
        let registry = DurableObjectRegistry::new();
        let handle = registry.get_or_create("ns", "key");

        {
            let mut storage = handle.storage().await;
            let count = storage
                .get("count")
                .and_then(Value::as_i64)
                .unwrap_or_default();
            storage.put("count", json!(count + 1));
        }

        assert_eq!(handle.get("count").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn delete_entry() {
        let registry = DurableObjectRegistry::new();
        let handle = registry.get_or_create("ns", "key");

        handle.put("k", json!("v")).await;
        assert!(handle.delete("k").await);
        assert!(!handle.delete("k").await);
        assert_eq!(handle.get("k").await, None);
    }

    #[tokio::test]
    async fn concurrent_updates_serialize() {
        let registry = Arc::new(DurableObjectRegistry::new());
        let handle = registry.get_or_create("ns", "counter");

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let mut storage = handle.storage().await;
                let count = storage
                    .get("count")
                    .and_then(Value::as_i64)
                    .unwrap_or_default();
                storage.put("count", json!(count + 1));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Every increment ran under the lock, so none were lost.
        assert_eq!(handle.get("count").await, Some(json!(10)));
    }
}
