//! Bounded in-memory package store
//!
//! A fixed-capacity, insertion-ordered ring of the most recent packages.
//! The server owns a single instance behind an `Arc<RwLock<_>>`; writes are
//! serialized by the writer lock and readers work from owned snapshots, so
//! an in-flight aggregation never observes a concurrent append.

use std::collections::VecDeque;

use crate::models::EnrichedPackage;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Insertion-ordered store that silently evicts its oldest entry at capacity.
pub struct BoundedStore {
    packages: VecDeque<EnrichedPackage>,
    capacity: usize,
}

impl BoundedStore {
    /// Create a store holding at most `capacity` packages.
    pub fn new(capacity: usize) -> Self {
        BoundedStore {
            packages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a package, evicting the oldest entry when full.
    ///
    /// Eviction is silent; callers get no signal that history was dropped.
    pub fn push(&mut self, package: EnrichedPackage) {
        if self.packages.len() == self.capacity {
            self.packages.pop_front();
        }
        self.packages.push_back(package);
    }

    /// Owned copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<EnrichedPackage> {
        self.packages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BoundedStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(ip: &str, timestamp: i64) -> EnrichedPackage {
        EnrichedPackage {
            ip: ip.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            timestamp,
            suspicious: false,
            country: "Unknown".to_string(),
            human_time: String::new(),
        }
    }

    #[test]
    fn test_eviction_keeps_newest_in_order() {
        let mut store = BoundedStore::new(3);
        for i in 0..5 {
            store.push(package(&format!("10.0.0.{}", i), i));
        }

        assert_eq!(store.len(), 3);
        let ips: Vec<String> = store.snapshot().into_iter().map(|p| p.ip).collect();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3", "10.0.0.4"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_pushes() {
        let mut store = BoundedStore::new(10);
        store.push(package("1.1.1.1", 1));

        let snapshot = store.snapshot();
        store.push(package("2.2.2.2", 2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let mut store = BoundedStore::new(100);
        for i in 0..7 {
            store.push(package("1.1.1.1", i));
        }
        assert_eq!(store.len(), 7);
        assert_eq!(store.capacity(), 100);
    }
}
