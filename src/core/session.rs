//! Keyed session state.
//!
//! All per-conversation mutable state (armed quantity prompts, order drafts,
//! undo pointers) lives behind this get/set/delete interface. The flow only
//! sees the trait, so the in-memory map can later be swapped for a durable
//! keyed store without touching the state machine.

use std::collections::HashMap;
use std::hash::Hash;

/// Minimal keyed store: get, set, delete.
pub trait KeyedStore<K, V> {
    fn get(&self, key: &K) -> Option<&V>;
    fn set(&mut self, key: K, value: V);
    fn delete(&mut self, key: &K) -> Option<V>;
}

/// Process-local map-backed store. State has process lifetime and no
/// cross-instance consistency.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    map: HashMap<K, V>,
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> MemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Eq + Hash, V> KeyedStore<K, V> for MemoryStore<K, V> {
    fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    fn set(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }

    fn delete(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }
}
