//! Bounded most-recent-first ring.
//!
//! Both journals (operation log, push ledger) keep their entries in one of
//! these: new entries go in at the head, and once the ring is full the oldest
//! entry falls off the tail.

use std::collections::VecDeque;

/// A capacity-bounded sequence ordered most-recent-first.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedRing<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedRing<T> {
    /// Create an empty ring holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the head, returning the evicted tail entry if the ring overflowed.
    pub fn push(&mut self, entry: T) -> Option<T> {
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Replace the whole ring with `entries` (already most-recent-first).
    ///
    /// Anything past the capacity is dropped from the tail.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = T>) {
        self.entries = entries.into_iter().take(self.capacity).collect();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ring holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Iterate most-recent-first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Up to `limit` entries starting `offset` entries from the head.
    pub fn window(&self, offset: usize, limit: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().skip(offset).take(limit)
    }
}

impl<T: Clone> BoundedRing<T> {
    /// Clone the contents into a `Vec`, most-recent-first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_orders_most_recent_first() {
        let mut ring = BoundedRing::new(3);
        ring.push(1);
        ring.push(2);
        ring.push(3);
        assert_eq!(ring.to_vec(), vec![3, 2, 1]);
        assert_eq!(ring.latest(), Some(&3));
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut ring = BoundedRing::new(2);
        assert_eq!(ring.push("a"), None);
        assert_eq!(ring.push("b"), None);
        assert_eq!(ring.push("c"), Some("a"));
        assert_eq!(ring.to_vec(), vec!["c", "b"]);
    }

    #[test]
    fn test_thousand_and_first_entry_evicts_first() {
        let mut ring = BoundedRing::new(1000);
        for i in 0..1000 {
            assert!(ring.push(i).is_none());
        }
        assert_eq!(ring.push(1000), Some(0));
        assert_eq!(ring.len(), 1000);
        assert_eq!(ring.iter().last(), Some(&1));
    }

    #[test]
    fn test_replace_all_truncates_to_capacity() {
        let mut ring = BoundedRing::new(2);
        ring.push(9);
        ring.replace_all(vec![5, 4, 3]);
        assert_eq!(ring.to_vec(), vec![5, 4]);
    }

    #[test]
    fn test_window() {
        let mut ring = BoundedRing::new(10);
        for i in 0..5 {
            ring.push(i);
        }
        let page: Vec<_> = ring.window(1, 2).copied().collect();
        assert_eq!(page, vec![3, 2]);
        assert_eq!(ring.window(10, 5).count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut ring = BoundedRing::new(0);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.to_vec(), vec![2]);
    }

    proptest! {
        /// The ring never exceeds its capacity, whatever the insert count.
        #[test]
        fn ring_never_exceeds_capacity(capacity in 1usize..64, inserts in 0usize..256) {
            let mut ring = BoundedRing::new(capacity);
            for i in 0..inserts {
                ring.push(i);
                prop_assert!(ring.len() <= capacity);
            }
            prop_assert_eq!(ring.len(), inserts.min(capacity));
        }

        /// The head is always the last inserted value.
        #[test]
        fn ring_head_is_last_insert(values in prop::collection::vec(any::<u32>(), 1..100)) {
            let mut ring = BoundedRing::new(16);
            for v in &values {
                ring.push(*v);
            }
            prop_assert_eq!(ring.latest(), values.last());
        }
    }
}
