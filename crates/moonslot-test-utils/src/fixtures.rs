//! Reusable values for container tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A two-field record ordered lexicographically by `(a, b)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotData {
    pub a: i32,
    pub b: i32,
}

impl SlotData {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }
}

/// The four records every round-trip scenario inserts, in sorted order.
pub fn sample_data() -> [SlotData; 4] {
    [
        SlotData::new(50, 85),
        SlotData::new(100, 90),
        SlotData::new(150, 95),
        SlotData::new(200, 100),
    ]
}

/// Shared count of destroyed [`Tracked`] values.
///
/// Clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct DropCounter {
    dropped: Arc<AtomicUsize>,
}

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `value` so its destruction is counted.
    pub fn track<T>(&self, value: T) -> Tracked<T> {
        Tracked {
            value,
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Number of tracked values dropped so far.
    pub fn count(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// A value that bumps its [`DropCounter`] when dropped.
#[derive(Debug)]
pub struct Tracked<T> {
    pub value: T,
    dropped: Arc<AtomicUsize>,
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: PartialEq> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Tracked<T> {}

impl<T: PartialOrd> PartialOrd for Tracked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Ord> Ord for Tracked<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_sees_each_drop() {
        let counter = DropCounter::new();
        let a = counter.track(1);
        let b = counter.track(2);
        drop(a);
        assert_eq!(counter.count(), 1);
        drop(b);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn sample_data_is_sorted() {
        let data = sample_data();
        assert!(data.windows(2).all(|w| w[0] < w[1]));
    }
}
