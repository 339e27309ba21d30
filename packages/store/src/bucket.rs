//! In-memory bucket store: one logical namespace per bucket name.
//!
//! A bucket object is identified by (bucket name, resource key). Objects are
//! created or replaced on write, removed on delete, and otherwise persist for
//! the process lifetime. A missing bucket or key is an absent-value outcome,
//! not an error.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value;

/// In-memory object store with atomic replace-on-write per (bucket, key).
///
/// Read-mostly: lookups take a shared lock, writes an exclusive one. The
/// lock is never held across an await point.
pub struct BucketStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl BucketStore {
    /// Create an empty store with no buckets.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Get the object at (bucket, key), if present.
    pub fn get(&self, bucket: &str, key: &str) -> Option<Value> {
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        buckets.get(bucket).and_then(|b| b.get(key)).cloned()
    }

    /// Create or replace the object at (bucket, key).
    pub fn put(&self, bucket: &str, key: &str, value: Value) {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Remove the object at (bucket, key). Returns whether it existed.
    pub fn delete(&self, bucket: &str, key: &str) -> bool {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets
            .get_mut(bucket)
            .map(|b| b.remove(key).is_some())
            .unwrap_or(false)
    }

    /// List the resource keys of a bucket, in sorted order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        buckets
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_get_roundtrip() {
        let store = BucketStore::new();
        store.put("scheduling", "dashboard", json!({"ok": true}));
        assert_eq!(
            store.get("scheduling", "dashboard"),
            Some(json!({"ok": true}))
        );
    }

    #[test]
    fn missing_is_none() {
        let store = BucketStore::new();
        assert_eq!(store.get("scheduling", "missing"), None);
        assert_eq!(store.get("no_such_bucket", "key"), None);
    }

    #[test]
    fn overwrite_replaces() {
        let store = BucketStore::new();
        store.put("b", "k", json!(1));
        store.put("b", "k", json!(2));
        assert_eq!(store.get("b", "k"), Some(json!(2)));
    }

    #[test]
    fn delete_removes() {
        let store = BucketStore::new();
        store.put("b", "k", json!("v"));
        assert!(store.delete("b", "k"));
        assert_eq!(store.get("b", "k"), None);
        assert!(!store.delete("b", "k"));
    }

    #[test]
    fn buckets_are_disjoint() {
        let store = BucketStore::new();
        store.put("scheduling", "k", json!("a"));
        store.put("reservation", "k", json!("b"));
        assert_eq!(store.get("scheduling", "k"), Some(json!("a")));
        assert_eq!(store.get("reservation", "k"), Some(json!("b")));
    }

    #[test]
    fn keys_sorted() {
        let store = BucketStore::new();
        store.put("b", "zebra", json!(1));
        store.put("b", "alpha", json!(2));
        assert_eq!(store.keys("b"), vec!["alpha", "zebra"]);
        assert!(store.keys("empty").is_empty());
    }
}
