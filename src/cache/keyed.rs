//! Keyed Cache Module
//!
//! Thread-safe string-keyed map guarded by a single mutex. Every resource
//! partition is built on top of it.

use std::collections::HashMap;

use parking_lot::Mutex;

// == Keyed Cache ==
/// Generic concurrency-safe key/value store.
///
/// All operations take the same lock for their whole duration, so a `get`
/// never observes a value that is being replaced by a concurrent `put`.
/// Values are cloned out; store `Arc`s to avoid deep copies.
#[derive(Debug)]
pub struct KeyedCache<V> {
    /// Backing map; `HashMap::new` does not allocate until the first insert
    entries: Mutex<HashMap<String, V>>,
}

impl<V: Clone> KeyedCache<V> {
    // == Constructor ==
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    // == Get ==
    /// Returns the value stored under `key`, or `None` if never set or removed.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous value.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.entries.lock().insert(key.into(), value);
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present; absent keys are a no-op.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    // == Keys ==
    /// Snapshot of the keys present at call time.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    // == Remove Where ==
    /// Removes every entry whose key matches `predicate` under one lock
    /// acquisition, returning the removed keys.
    pub fn remove_where<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut entries = self.entries.lock();
        let doomed: Vec<String> = entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();

        for key in &doomed {
            entries.remove(key);
        }
        doomed
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V: Clone> Default for KeyedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
