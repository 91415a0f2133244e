//! Bounded recency-ordered sets.
//!
//! `RecencySet` backs both inbound-update deduplication and the single-fire
//! prompt gate. Capacity is bounded: inserting past capacity evicts the
//! least-recently-used entry. Eviction is a correctness trade-off, not a bug:
//! an entry older than the last N admitted ones becomes re-admittable, which
//! is acceptable because the upstream retry policy only retries recent
//! failures.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// A bounded set that remembers the N most recently seen keys.
#[derive(Debug)]
pub struct RecencySet<K> {
    capacity: usize,
    order: VecDeque<K>,
    seen: HashSet<K>,
}

impl<K: Eq + Hash + Clone> RecencySet<K> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "recency set capacity must be non-zero");
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Admit a key. Returns true and records it the first time it is seen;
    /// returns false on any later call with the same key, refreshing its
    /// recency so hot keys are not evicted.
    pub fn admit(&mut self, key: K) -> bool {
        if self.seen.contains(&key) {
            // Recency bump only, no other side effect.
            if let Some(pos) = self.order.iter().position(|k| *k == key) {
                self.order.remove(pos);
            }
            self.order.push_back(key);
            return false;
        }

        self.seen.insert(key.clone());
        self.order.push_back(key);

        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }

        true
    }

    /// Drop a key from the set. Returns true if it was present.
    pub fn forget(&mut self, key: &K) -> bool {
        if !self.seen.remove(key) {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A resettable single-fire latch keyed by a composite identity.
///
/// Prevents a double-tap on a modifier-eligible item from issuing the
/// modifier prompt twice. Cancellation calls `reset`, re-arming the gate so
/// reselecting the item prompts again.
#[derive(Debug)]
pub struct OnceGate<K> {
    fired: RecencySet<K>,
}

impl<K: Eq + Hash + Clone> OnceGate<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            fired: RecencySet::new(capacity),
        }
    }

    /// True exactly once per key until `reset` is called for it.
    pub fn fire_once(&mut self, key: K) -> bool {
        self.fired.admit(key)
    }

    /// Re-arm the gate for a key.
    pub fn reset(&mut self, key: &K) {
        self.fired.forget(key);
    }
}
