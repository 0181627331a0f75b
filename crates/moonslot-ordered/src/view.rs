//! Locked sorted iteration over an
//! [`OrderedSlotMap`](crate::OrderedSlotMap).

use std::sync::Arc;

use moonslot_core::lock_api::{MutexGuard, RawMutex};
use moonslot_core::{Moon, NoLock, SlotStore};

use crate::map::{Handle, WeakHandle};
use crate::store::OrderedStore;

/// A locked view of an ordered slot map.
///
/// Holds the map's lock for as long as it lives.
pub struct View<'a, T, R: RawMutex = NoLock> {
    moon: &'a Arc<Moon<OrderedStore<T>, R>>,
    store: MutexGuard<'a, R, OrderedStore<T>>,
}

impl<'a, T, R: RawMutex> View<'a, T, R> {
    pub(crate) fn new(moon: &'a Arc<Moon<OrderedStore<T>, R>>) -> Self {
        Self {
            store: moon.lock(),
            moon,
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True if no object is live.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Object behind `handle`, if it is current and was issued by this map.
    pub fn get(&self, handle: &Handle<T, R>) -> Option<&T> {
        if !handle.belongs_to(self.moon) {
            return None;
        }
        self.store.resolve(handle.key()?)
    }

    /// Object behind a weak handle, under the same rules as [`get`](Self::get).
    pub fn get_weak(&self, handle: &WeakHandle<T, R>) -> Option<&T> {
        if !handle.belongs_to(self.moon) {
            return None;
        }
        self.store.resolve(handle.key()?)
    }

    /// Object at sorted rank `position`.
    pub fn nth(&self, position: usize) -> Option<&T> {
        self.store.values().nth(position)
    }

    /// Objects in sorted order; reverse with `.rev()`.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.store.values()
    }
}

#[cfg(test)]
mod tests {
    use crate::OrderedSlotMap;

    #[test]
    fn view_walks_both_directions() {
        let map = OrderedSlotMap::new();
        let _h = map.insert_all([3, 1, 2]);
        let view = map.view();
        assert_eq!(view.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(view.iter().rev().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(view.nth(1), Some(&2));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn view_resolves_handles() {
        let map = OrderedSlotMap::new();
        let h = map.insert("x");
        let view = map.view();
        assert_eq!(view.get(&h), Some(&"x"));
    }

    #[test]
    fn view_ignores_handles_from_other_maps() {
        let left = OrderedSlotMap::new();
        let right = OrderedSlotMap::new();
        let left_handle = left.insert("left-object");
        let right_handle = right.insert("right-object");
        let left_weak = left_handle.downgrade();

        let view = right.view();
        assert_eq!(view.get(&left_handle), None);
        assert_eq!(view.get_weak(&left_weak), None);
        assert_eq!(view.get(&right_handle), Some(&"right-object"));
    }
}
