//! The sorted slot map container.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use log::debug;
use moonslot_core::lock_api::{MappedMutexGuard, MutexGuard, RawMutex};
use moonslot_core::{
    or_panic, Moon, NoLock, SlotError, SlotKey, SlotMapConfig, SlotStore, SyncLock,
};

use crate::store::OrderedStore;
use crate::view::View;

/// Owning handle into an [`OrderedSlotMap`].
pub type Handle<T, R = NoLock> = moonslot_core::Handle<OrderedStore<T>, R>;

/// Weak handle into an [`OrderedSlotMap`].
pub type WeakHandle<T, R = NoLock> = moonslot_core::WeakHandle<OrderedStore<T>, R>;

/// Lock guard mapped onto one object of an [`OrderedSlotMap`].
pub type Guard<'a, T, R = NoLock> = MappedMutexGuard<'a, R, T>;

/// An [`OrderedSlotMap`] that can be shared across threads.
pub type SyncOrderedSlotMap<T> = OrderedSlotMap<T, SyncLock>;

/// Generational slot map that keeps its objects sorted.
///
/// Handles behave exactly as in the dense map: strong handles keep an
/// object alive, weak handles observe it, and a handle never resolves to
/// a later occupant of its slot. Iteration through [`view`] visits
/// objects in comparator order; equal objects keep insertion order.
///
/// The container can also hold a strong count itself ([`own`]), so an
/// object survives after every caller handle is gone until [`release`]
/// or [`clear`].
///
/// Insertion and destruction shift the tail of the sorted sequence and
/// run in O(n).
///
/// [`view`]: OrderedSlotMap::view
/// [`own`]: OrderedSlotMap::own
/// [`release`]: OrderedSlotMap::release
/// [`clear`]: OrderedSlotMap::clear
pub struct OrderedSlotMap<T, R: RawMutex = NoLock> {
    moon: Arc<Moon<OrderedStore<T>, R>>,
}

impl<T> OrderedSlotMap<T> {
    /// Create a single-threaded map with the default capacity of 50 slots.
    pub fn new() -> Self {
        Self::with_capacity(SlotMapConfig::DEFAULT_INITIAL_CAPACITY)
    }

    /// Create a single-threaded map with `capacity` free slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds the `u32` index space.
    pub fn with_capacity(capacity: usize) -> Self {
        or_panic(Self::with_config(SlotMapConfig::new(capacity)))
    }
}

impl<T: Ord, R: RawMutex> OrderedSlotMap<T, R> {
    /// Insert in natural order and return the first strong handle.
    ///
    /// # Panics
    ///
    /// Panics if the map has reached its slot limit.
    pub fn insert(&self, value: T) -> Handle<T, R> {
        or_panic(self.try_insert(value))
    }

    /// Insert in natural order, failing if the map cannot grow.
    pub fn try_insert(&self, value: T) -> Result<Handle<T, R>, SlotError> {
        self.insert_with(value, T::cmp, false)
    }

    /// Insert in natural order and have the container own the object.
    pub fn insert_owned(&self, value: T) -> Handle<T, R> {
        or_panic(self.insert_with(value, T::cmp, true))
    }

    /// Insert every value from `values`, returning handles in input order.
    ///
    /// # Panics
    ///
    /// Panics if the map reaches its slot limit part way through.
    pub fn insert_all<I>(&self, values: I) -> Vec<Handle<T, R>>
    where
        I: IntoIterator<Item = T>,
    {
        or_panic(self.try_insert_all(values))
    }

    /// Insert every value from `values` under a single lock.
    ///
    /// The values are collected before the map is locked. No other thread
    /// sees a partial batch. If the slot limit is reached, the values
    /// already inserted are destroyed again and the error is returned.
    pub fn try_insert_all<I>(&self, values: I) -> Result<Vec<Handle<T, R>>, SlotError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut pending = values.into_iter().collect::<Vec<T>>().into_iter();
        let mut keys = Vec::with_capacity(pending.len());
        let failure = {
            let mut store = self.moon.lock();
            pending
                .by_ref()
                .find_map(|value| match store.insert_by(value, T::cmp, false) {
                    Ok(key) => {
                        keys.push(key);
                        None
                    }
                    Err(rejected) => Some(rejected),
                })
        };
        let handles: Vec<_> = keys
            .into_iter()
            .map(|key| Handle::from_issued(&self.moon, key))
            .collect();
        match failure {
            None => Ok(handles),
            Some(rejected) => {
                drop(handles);
                drop(pending);
                Err(rejected.error)
            }
        }
    }
}

impl<T, R: RawMutex> OrderedSlotMap<T, R> {
    /// Create a map from a config.
    pub fn with_config(config: SlotMapConfig) -> Result<Self, SlotError> {
        Ok(Self {
            moon: Moon::new(OrderedStore::with_config(&config)?),
        })
    }

    /// Insert using `compare` to find the position.
    ///
    /// The value goes after every element that does not compare greater.
    /// `compare` must be consistent with the order already in the map.
    pub fn insert_by<F>(&self, value: T, compare: F) -> Handle<T, R>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        or_panic(self.try_insert_by(value, compare))
    }

    /// Fallible [`insert_by`](Self::insert_by).
    pub fn try_insert_by<F>(&self, value: T, compare: F) -> Result<Handle<T, R>, SlotError>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.insert_with(value, compare, false)
    }

    /// Insert ordered by the key `f` extracts.
    pub fn insert_by_key<K, F>(&self, value: T, mut f: F) -> Handle<T, R>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.insert_by(value, |a, b| f(a).cmp(&f(b)))
    }

    /// [`insert_by`](Self::insert_by), with the container owning the
    /// object.
    pub fn insert_owned_by<F>(&self, value: T, compare: F) -> Handle<T, R>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        or_panic(self.insert_with(value, compare, true))
    }

    /// Release `handle`'s strong reference, leaving it empty.
    ///
    /// The object is destroyed, and the objects after it shift down, if
    /// this was its last strong reference. Returns `false` for empty or
    /// foreign handles.
    pub fn erase(&self, handle: &mut Handle<T, R>) -> bool {
        if !handle.belongs_to(&self.moon) {
            return false;
        }
        handle.reset();
        true
    }

    /// Release `handle`'s weak reference, leaving it empty.
    pub fn erase_weak(&self, handle: &mut WeakHandle<T, R>) -> bool {
        if !handle.belongs_to(&self.moon) {
            return false;
        }
        handle.reset();
        true
    }

    /// Destroy the object behind `handle` now and return it.
    ///
    /// Ownership and every other handle's count are ignored; all other
    /// handles to the object become stale. `handle` is left empty.
    pub fn remove(&self, handle: &mut Handle<T, R>) -> Option<T> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        let key = handle.key()?;
        let removed = self.moon.lock().remove(key);
        handle.reset();
        removed
    }

    /// Have the container hold a strong count on the object.
    ///
    /// Returns `true` if the object is now owned, including when it
    /// already was. Stale and foreign handles return `false`.
    pub fn own(&self, handle: &Handle<T, R>) -> bool {
        let Some(key) = self.key_of(handle) else {
            return false;
        };
        self.moon.lock().own(key)
    }

    /// Drop the container's strong count on the object.
    ///
    /// Returns whether the object was owned. If no other strong handle
    /// remains the object is destroyed.
    pub fn release(&self, handle: &Handle<T, R>) -> bool {
        let Some(key) = self.key_of(handle) else {
            return false;
        };
        let (was_owned, reclaimed) = self.moon.lock().disown(key);
        drop(reclaimed);
        was_owned
    }

    /// True if the container holds a strong count on the object.
    pub fn owns(&self, handle: &Handle<T, R>) -> bool {
        let Some(key) = self.key_of(handle) else {
            return false;
        };
        self.moon.lock().owns(key)
    }

    /// Rank of the object in sorted order.
    pub fn position(&self, handle: &Handle<T, R>) -> Option<usize> {
        let key = self.key_of(handle)?;
        self.moon.lock().position(key)
    }

    /// [`own`](Self::own) through a weak handle.
    ///
    /// Succeeds only while the object is alive. Once owned, the object
    /// survives even if no strong handle remains.
    pub fn own_weak(&self, handle: &WeakHandle<T, R>) -> bool {
        let Some(key) = self.weak_key_of(handle) else {
            return false;
        };
        self.moon.lock().own(key)
    }

    /// [`release`](Self::release) through a weak handle.
    pub fn release_weak(&self, handle: &WeakHandle<T, R>) -> bool {
        let Some(key) = self.weak_key_of(handle) else {
            return false;
        };
        let (was_owned, reclaimed) = self.moon.lock().disown(key);
        drop(reclaimed);
        was_owned
    }

    /// [`owns`](Self::owns) through a weak handle.
    pub fn owns_weak(&self, handle: &WeakHandle<T, R>) -> bool {
        let Some(key) = self.weak_key_of(handle) else {
            return false;
        };
        self.moon.lock().owns(key)
    }

    /// [`position`](Self::position) through a weak handle.
    pub fn position_weak(&self, handle: &WeakHandle<T, R>) -> Option<usize> {
        let key = self.weak_key_of(handle)?;
        self.moon.lock().position(key)
    }

    /// True if `handle` came from this map and its object is alive.
    pub fn is_valid(&self, handle: &Handle<T, R>) -> bool {
        handle.belongs_to(&self.moon) && self.is_current(handle.key())
    }

    /// True if `handle` came from this map and its object is alive.
    pub fn is_valid_weak(&self, handle: &WeakHandle<T, R>) -> bool {
        handle.belongs_to(&self.moon) && self.is_current(handle.key())
    }

    /// Lock the map and borrow the object behind `handle`.
    ///
    /// See [`with_mut`](Self::with_mut) for the rule on mutating through
    /// the guard.
    pub fn get(&self, handle: &Handle<T, R>) -> Option<Guard<'_, T, R>> {
        let key = self.key_of(handle)?;
        self.guard(key)
    }

    /// Lock the map and borrow the object behind a weak handle.
    pub fn get_weak(&self, handle: &WeakHandle<T, R>) -> Option<Guard<'_, T, R>> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        self.guard(handle.key()?)
    }

    /// Run `f` on the object behind `handle` under the lock.
    pub fn with<U>(&self, handle: &Handle<T, R>, f: impl FnOnce(&T) -> U) -> Option<U> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        handle.with(f)
    }

    /// Run `f` on the object behind `handle` mutably under the lock.
    ///
    /// The map is never re-sorted. `f` must not change how the object
    /// compares to its neighbours; if it does, iteration order and later
    /// insert positions are unspecified, though handles stay sound.
    pub fn with_mut<U>(&self, handle: &Handle<T, R>, f: impl FnOnce(&mut T) -> U) -> Option<U> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        handle.with_mut(f)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.moon.lock().len()
    }

    /// True if the map holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, live or free.
    pub fn capacity(&self) -> usize {
        self.moon.lock().table().capacity()
    }

    /// Destroy every object and drop all ownership. Outstanding handles
    /// become stale.
    pub fn clear(&self) {
        let values = self.moon.lock().clear();
        drop(values);
    }

    /// Rebuild the free list in slot order.
    pub fn defragment(&self) {
        self.moon.lock().table_mut().defragment();
    }

    /// Grow the map to `slots` slots. Never shrinks.
    pub fn resize(&self, slots: usize) -> Result<(), SlotError> {
        self.moon.lock().table_mut().resize(slots)
    }

    /// Reserve storage for `additional` more objects.
    pub fn reserve(&self, additional: usize) {
        self.moon.lock().reserve(additional);
    }

    /// Release trailing slots no handle refers to and shrink storage.
    pub fn shrink_to_fit(&self) {
        self.moon.lock().shrink_to_fit();
    }

    /// Lock the map for sorted iteration.
    pub fn view(&self) -> View<'_, T, R> {
        View::new(&self.moon)
    }

    /// Number of handles, strong or weak, bound to this map.
    pub fn outstanding_handles(&self) -> usize {
        Moon::outstanding_handles(&self.moon)
    }

    /// Copy every object, in order, into a new map.
    ///
    /// Returns the copy and one strong handle per object in sorted order.
    /// Objects owned here are owned by the copy too. Values are cloned
    /// while this map is locked.
    pub fn duplicate(&self) -> (Self, Vec<Handle<T, R>>)
    where
        T: Clone,
    {
        let (snapshot, config) = {
            let store = self.moon.lock();
            let table = store.table();
            let config = SlotMapConfig::new(table.capacity()).max_slots(table.max_slots());
            (store.snapshot(), config)
        };
        let copy = or_panic(Self::with_config(config));
        let handles = snapshot
            .into_iter()
            .map(|(value, owned)| {
                let pushed = copy.moon.lock().push(value, owned);
                match pushed {
                    Ok(key) => Handle::from_issued(&copy.moon, key),
                    Err(rejected) => panic!("{}", rejected.error),
                }
            })
            .collect();
        (copy, handles)
    }

    fn insert_with<F>(&self, value: T, compare: F, owned: bool) -> Result<Handle<T, R>, SlotError>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let inserted = self.moon.lock().insert_by(value, compare, owned);
        match inserted {
            Ok(key) => Ok(Handle::from_issued(&self.moon, key)),
            Err(rejected) => Err(rejected.error),
        }
    }

    fn key_of(&self, handle: &Handle<T, R>) -> Option<SlotKey> {
        if handle.belongs_to(&self.moon) {
            handle.key()
        } else {
            None
        }
    }

    fn weak_key_of(&self, handle: &WeakHandle<T, R>) -> Option<SlotKey> {
        if handle.belongs_to(&self.moon) {
            handle.key()
        } else {
            None
        }
    }

    fn is_current(&self, key: Option<SlotKey>) -> bool {
        match key {
            Some(key) => self.moon.lock().is_current(key),
            None => false,
        }
    }

    fn guard(&self, key: SlotKey) -> Option<Guard<'_, T, R>> {
        MutexGuard::try_map(self.moon.lock(), |store| store.resolve_mut(key)).ok()
    }
}

impl<T, R: RawMutex> Default for OrderedSlotMap<T, R> {
    fn default() -> Self {
        or_panic(Self::with_config(SlotMapConfig::default()))
    }
}

impl<T, R: RawMutex> Drop for OrderedSlotMap<T, R> {
    fn drop(&mut self) {
        let outstanding = Moon::outstanding_handles(&self.moon);
        if outstanding > 0 {
            debug!("ordered slot map dropped with {outstanding} outstanding handles");
        }
    }
}

impl<T, R: RawMutex> fmt::Debug for OrderedSlotMap<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedSlotMap")
            .field("outstanding_handles", &self.outstanding_handles())
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: the thread-safe map and its handles can cross
// threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SyncOrderedSlotMap<u64>>();
    assert::<Handle<u64, SyncLock>>();
    assert::<WeakHandle<u64, SyncLock>>();
};
