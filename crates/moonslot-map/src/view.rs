//! Locked iteration over a [`SlotMap`](crate::SlotMap).

use std::sync::Arc;

use moonslot_core::lock_api::{MutexGuard, RawMutex};
use moonslot_core::{Moon, NoLock, SlotStore};

use crate::map::{Handle, WeakHandle};
use crate::store::DenseStore;

/// A locked view of a slot map.
///
/// Holds the map's lock for as long as it lives. Iteration visits live
/// objects in slot order, front to back or in reverse.
pub struct View<'a, T, R: RawMutex = NoLock> {
    moon: &'a Arc<Moon<DenseStore<T>, R>>,
    store: MutexGuard<'a, R, DenseStore<T>>,
}

impl<'a, T, R: RawMutex> View<'a, T, R> {
    pub(crate) fn new(moon: &'a Arc<Moon<DenseStore<T>, R>>) -> Self {
        Self {
            store: moon.lock(),
            moon,
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.store.table().len()
    }

    /// True if no object is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
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

    /// Live objects in slot order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.store.table().iter().map(|(_, value)| value)
    }

    /// Live objects in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + '_ {
        self.store.table_mut().iter_mut().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use crate::SlotMap;

    #[test]
    fn view_ignores_handles_from_other_maps() {
        let left = SlotMap::new();
        let right = SlotMap::new();
        let left_handle = left.insert("left-object");
        let right_handle = right.insert("right-object");
        let left_weak = left_handle.downgrade();

        let view = right.view();
        assert_eq!(view.get(&left_handle), None);
        assert_eq!(view.get_weak(&left_weak), None);
        assert_eq!(view.get(&right_handle), Some(&"right-object"));
    }

    #[test]
    fn view_resolves_weak_handles_until_destroyed() {
        let map = SlotMap::new();
        let strong = map.insert(7u32);
        let weak = strong.downgrade();
        {
            let view = map.view();
            assert_eq!(view.get_weak(&weak), Some(&7));
        }
        drop(strong);
        let view = map.view();
        assert_eq!(view.get_weak(&weak), None);
        assert!(view.is_empty());
    }

    #[test]
    fn view_iter_mut_updates_in_place() {
        let map = SlotMap::new();
        let handles = map.insert_all([1u32, 2, 3]);
        {
            let mut view = map.view();
            for value in view.iter_mut() {
                *value *= 10;
            }
        }
        let view = map.view();
        assert_eq!(view.iter().copied().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(view.get(&handles[2]), Some(&30));
    }
}
