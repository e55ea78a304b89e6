//! ReadCache implementation
//!
//! HashMap for lookups plus a VecDeque recording insertion order.

use std::collections::{HashMap, VecDeque};

use crate::record::Value;

use super::DEFAULT_CAPACITY;

/// Bounded, insertion-ordered map from `database.key` to decoded value
#[derive(Debug)]
pub struct ReadCache {
    entries: HashMap<String, Value>,
    /// Oldest first
    order: VecDeque<String>,
    capacity: usize,
}

impl ReadCache {
    /// Create a cache with the default bound of 30 entries
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Look up a value; does not affect eviction order
    pub fn get(&self, qualified_key: &str) -> Option<&Value> {
        self.entries.get(qualified_key)
    }

    pub fn contains(&self, qualified_key: &str) -> bool {
        self.entries.contains_key(qualified_key)
    }

    /// Insert a value, then trim the oldest entries beyond capacity
    ///
    /// Re-inserting an existing key replaces its value but keeps its position.
    pub fn insert(&mut self, qualified_key: String, value: Value) {
        if self.entries.insert(qualified_key.clone(), value).is_none() {
            self.order.push_back(qualified_key);
        }

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::trace!("Evicted \"{}\" from read cache", oldest);
            }
        }
    }

    /// Remove one entry; returns whether it was present
    pub fn remove(&mut self, qualified_key: &str) -> bool {
        if self.entries.remove(qualified_key).is_none() {
            return false;
        }
        self.order.retain(|k| k != qualified_key);
        true
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached keys, oldest first
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new()
    }
}
