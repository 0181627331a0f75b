//! The dense slot map container.

use std::fmt;
use std::sync::Arc;

use log::debug;
use moonslot_core::lock_api::{MappedMutexGuard, MutexGuard, RawMutex};
use moonslot_core::{
    or_panic, Moon, NoLock, SlotError, SlotKey, SlotMapConfig, SlotStore, SyncLock,
};

use crate::store::DenseStore;
use crate::view::View;

/// Owning handle into a [`SlotMap`].
pub type Handle<T, R = NoLock> = moonslot_core::Handle<DenseStore<T>, R>;

/// Weak handle into a [`SlotMap`].
pub type WeakHandle<T, R = NoLock> = moonslot_core::WeakHandle<DenseStore<T>, R>;

/// Lock guard mapped onto one object of a [`SlotMap`].
pub type Guard<'a, T, R = NoLock> = MappedMutexGuard<'a, R, T>;

/// A [`SlotMap`] that can be shared across threads.
pub type SyncSlotMap<T> = SlotMap<T, SyncLock>;

/// Generational slot map with reference-counted handles.
///
/// Objects live in a dense table of generation-tagged slots. [`insert`]
/// returns a strong [`Handle`]; the object stays alive while any strong
/// handle to it exists and is destroyed, freeing its slot for reuse,
/// when the last one is released. Handles issued for an earlier
/// occupant of a recycled slot carry an older generation and never
/// resolve to the new object.
///
/// Every method takes `&self` and serializes on the lock policy `R`.
/// Object destructors run after the lock is released.
///
/// [`insert`]: SlotMap::insert
pub struct SlotMap<T, R: RawMutex = NoLock> {
    moon: Arc<Moon<DenseStore<T>, R>>,
}

impl<T> SlotMap<T> {
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

impl<T, R: RawMutex> SlotMap<T, R> {
    /// Create a map from a config.
    pub fn with_config(config: SlotMapConfig) -> Result<Self, SlotError> {
        Ok(Self {
            moon: Moon::new(DenseStore::with_config(&config)?),
        })
    }

    /// Insert a value and return the first strong handle to it.
    ///
    /// # Panics
    ///
    /// Panics if the map has reached its slot limit. Use
    /// [`try_insert`](Self::try_insert) to handle that case.
    pub fn insert(&self, value: T) -> Handle<T, R> {
        or_panic(self.try_insert(value))
    }

    /// Insert a value, failing if the map cannot grow.
    pub fn try_insert(&self, value: T) -> Result<Handle<T, R>, SlotError> {
        let inserted = self.moon.lock().insert(value);
        match inserted {
            Ok(key) => Ok(Handle::from_issued(&self.moon, key)),
            Err(rejected) => Err(rejected.error),
        }
    }

    /// Insert every value from `values`, returning their handles in order.
    ///
    /// # Panics
    ///
    /// Panics if the map reaches its slot limit part way through. Use
    /// [`try_insert_all`](Self::try_insert_all) to handle that case.
    pub fn insert_all<I>(&self, values: I) -> Vec<Handle<T, R>>
    where
        I: IntoIterator<Item = T>,
    {
        or_panic(self.try_insert_all(values))
    }

    /// Insert every value from `values` under a single lock.
    ///
    /// The values are collected before the map is locked, so the iterator
    /// may itself use the map. No other thread sees a partial batch. If
    /// the slot limit is reached, the values already inserted are
    /// destroyed again and the error is returned.
    pub fn try_insert_all<I>(&self, values: I) -> Result<Vec<Handle<T, R>>, SlotError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut pending = values.into_iter().collect::<Vec<T>>().into_iter();
        let mut keys = Vec::with_capacity(pending.len());
        let failure = {
            let mut store = self.moon.lock();
            pending.by_ref().find_map(|value| match store.insert(value) {
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

    /// Release `handle`'s strong reference, leaving it empty.
    ///
    /// The object is destroyed if this was its last strong reference.
    /// Returns `false`, without touching the handle, if it is empty or
    /// belongs to another container; erasing twice is therefore a no-op.
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

    /// Destroy the object behind `handle` now, regardless of other strong
    /// handles, and return it.
    ///
    /// Every other handle to the object becomes stale. `handle` is left
    /// empty. Returns `None` if the handle was already stale or foreign.
    pub fn remove(&self, handle: &mut Handle<T, R>) -> Option<T> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        let key = handle.key()?;
        let removed = self.moon.lock().remove(key);
        handle.reset();
        removed
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
    /// The map stays locked until the guard is dropped; cloning or
    /// dropping handles into this map meanwhile panics under [`NoLock`]
    /// and deadlocks under a real mutex.
    pub fn get(&self, handle: &Handle<T, R>) -> Option<Guard<'_, T, R>> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        self.guard(handle.key()?)
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
    pub fn with_mut<U>(&self, handle: &Handle<T, R>, f: impl FnOnce(&mut T) -> U) -> Option<U> {
        if !handle.belongs_to(&self.moon) {
            return None;
        }
        handle.with_mut(f)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.moon.lock().table().len()
    }

    /// True if the map holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, live or free.
    pub fn capacity(&self) -> usize {
        self.moon.lock().table().capacity()
    }

    /// Destroy every object. All outstanding handles become stale.
    pub fn clear(&self) {
        let values = self.moon.lock().table_mut().clear();
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

    /// Reserve backing storage for `additional` more slots.
    pub fn reserve(&self, additional: usize) {
        self.moon.lock().table_mut().reserve(additional);
    }

    /// Release trailing slots no handle refers to and shrink storage.
    pub fn shrink_to_fit(&self) {
        self.moon.lock().table_mut().shrink_to_fit();
    }

    /// Lock the map for iteration.
    pub fn view(&self) -> View<'_, T, R> {
        View::new(&self.moon)
    }

    /// Number of handles, strong or weak, bound to this map.
    pub fn outstanding_handles(&self) -> usize {
        Moon::outstanding_handles(&self.moon)
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

impl<T, R: RawMutex> Default for SlotMap<T, R> {
    fn default() -> Self {
        or_panic(Self::with_config(SlotMapConfig::default()))
    }
}

impl<T, R: RawMutex> Drop for SlotMap<T, R> {
    fn drop(&mut self) {
        let outstanding = Moon::outstanding_handles(&self.moon);
        if outstanding > 0 {
            debug!("slot map dropped with {outstanding} outstanding handles");
        }
    }
}

impl<T, R: RawMutex> fmt::Debug for SlotMap<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotMap")
            .field("outstanding_handles", &self.outstanding_handles())
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: the thread-safe map and its handles can cross
// threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SyncSlotMap<u64>>();
    assert::<Handle<u64, SyncLock>>();
    assert::<WeakHandle<u64, SyncLock>>();
};
