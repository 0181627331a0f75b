//! Backing store for [`OrderedSlotMap`](crate::OrderedSlotMap).
//!
//! Objects live in a `Vec` kept sorted by the caller's comparator. Each
//! entry records its slot, and each live slot records the entry's
//! position, so a handle reaches its object in O(1) and an object can be
//! removed by identity without searching.
//!
//! ```text
//!  entries (sorted)            table (slot -> position)
//!  0: {50,85}   slot 1         slot 0: Live(2)
//!  1: {100,90}  slot 2         slot 1: Live(0)
//!  2: {150,95}  slot 0         slot 2: Live(1)
//!                              slot 3: Free
//! ```
//!
//! Inserting or removing in the middle shifts the suffix and rewrites
//! the position stored in each displaced entry's slot.

use std::cmp::Ordering;

use moonslot_core::{
    GenerationLedger, RefKind, Rejected, SlotError, SlotIndex, SlotKey, SlotMapConfig, SlotStore,
    SlotTable,
};

#[derive(Debug)]
struct Entry<T> {
    value: T,
    slot: SlotIndex,
}

/// Objects kept in sorted order, addressed through generation-tagged
/// slots.
#[derive(Debug)]
pub struct OrderedStore<T> {
    entries: Vec<Entry<T>>,
    table: SlotTable<usize>,
    /// Keys the container holds a strong count for, sorted.
    owned: Vec<SlotKey>,
}

impl<T> OrderedStore<T> {
    pub(crate) fn with_config(config: &SlotMapConfig) -> Result<Self, SlotError> {
        let table = SlotTable::with_config(config)?;
        Ok(Self {
            entries: Vec::with_capacity(config.initial_capacity),
            table,
            owned: Vec::new(),
        })
    }

    /// The slot table mapping slots to sorted positions.
    pub fn table(&self) -> &SlotTable<usize> {
        &self.table
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no object is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Objects in sorted order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.entries.iter().map(|entry| &entry.value)
    }

    /// Sorted position of the object behind a current key.
    pub fn position(&self, key: SlotKey) -> Option<usize> {
        if self.is_current(key) {
            self.table.get(key.index).copied()
        } else {
            None
        }
    }

    /// True if the container holds a strong count for `key`.
    pub fn owns(&self, key: SlotKey) -> bool {
        self.owned.binary_search(&key).is_ok()
    }

    /// Insert after every element that does not compare greater than
    /// `value`, so equal elements keep insertion order.
    pub(crate) fn insert_by<F>(
        &mut self,
        value: T,
        mut compare: F,
        owned: bool,
    ) -> Result<SlotKey, Rejected<T>>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let position = self
            .entries
            .partition_point(|entry| compare(&entry.value, &value) != Ordering::Greater);
        self.insert_at(position, value, owned)
    }

    /// Insert past the last element.
    pub(crate) fn push(&mut self, value: T, owned: bool) -> Result<SlotKey, Rejected<T>> {
        self.insert_at(self.entries.len(), value, owned)
    }

    fn insert_at(
        &mut self,
        position: usize,
        value: T,
        owned: bool,
    ) -> Result<SlotKey, Rejected<T>> {
        let key = match self.table.insert(position) {
            Ok(key) => key,
            Err(rejected) => {
                return Err(Rejected {
                    error: rejected.error,
                    value,
                })
            }
        };
        self.entries.insert(
            position,
            Entry {
                value,
                slot: key.index,
            },
        );
        self.reindex_from(position + 1);
        if owned {
            self.own(key);
        }
        Ok(key)
    }

    /// Take a strong count on behalf of the container.
    ///
    /// Owning an already owned key is a no-op that still reports success.
    /// Returns `false` for stale keys.
    pub(crate) fn own(&mut self, key: SlotKey) -> bool {
        if !self.is_current(key) {
            return false;
        }
        match self.owned.binary_search(&key) {
            Ok(_) => true,
            Err(at) => {
                let acquired = self.acquire(key, RefKind::Strong);
                if acquired {
                    self.owned.insert(at, key);
                }
                acquired
            }
        }
    }

    /// Drop the container's strong count for `key`.
    ///
    /// Returns whether the key was owned, plus the object if that was its
    /// last strong count.
    pub(crate) fn disown(&mut self, key: SlotKey) -> (bool, Option<T>) {
        match self.owned.binary_search(&key) {
            Ok(at) => {
                self.owned.remove(at);
                (true, self.release(key, RefKind::Strong))
            }
            Err(_) => (false, None),
        }
    }

    /// Destroy the object behind a current key, whatever its counts.
    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<T> {
        if !self.is_current(key) {
            return None;
        }
        if let (true, Some(value)) = self.disown(key) {
            return Some(value);
        }
        self.reclaim(key.index)
    }

    /// Destroy every object, returning them in sorted order.
    pub(crate) fn clear(&mut self) -> Vec<T> {
        let owned = std::mem::take(&mut self.owned);
        self.table.clear();
        // The owned generations are stale now; dropping their counts only
        // lets the ledgers compact.
        for key in owned {
            if let Some(ledger) = self.table.ledger_mut(key.index) {
                ledger.decrement_generation(key.generation, RefKind::Strong);
            }
        }
        self.entries.drain(..).map(|entry| entry.value).collect()
    }

    /// Snapshot of every value with its ownership flag, in sorted order.
    pub(crate) fn snapshot(&self) -> Vec<(T, bool)>
    where
        T: Clone,
    {
        self.entries
            .iter()
            .map(|entry| {
                let owned = self
                    .owned
                    .binary_search_by_key(&entry.slot, |key| key.index)
                    .is_ok();
                (entry.value.clone(), owned)
            })
            .collect()
    }

    pub(crate) fn table_mut(&mut self) -> &mut SlotTable<usize> {
        &mut self.table
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
        self.entries.reserve(additional);
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
        self.entries.shrink_to_fit();
        self.owned.shrink_to_fit();
    }

    fn reindex_from(&mut self, start: usize) {
        for (position, entry) in self.entries.iter().enumerate().skip(start) {
            if let Some(slot) = self.table.get_mut(entry.slot) {
                *slot = position;
            }
        }
    }
}

impl<T> SlotStore for OrderedStore<T> {
    type Value = T;

    fn ledger(&self, index: SlotIndex) -> Option<&GenerationLedger> {
        self.table.ledger(index)
    }

    fn ledger_mut(&mut self, index: SlotIndex) -> Option<&mut GenerationLedger> {
        self.table.ledger_mut(index)
    }

    fn object(&self, index: SlotIndex) -> Option<&T> {
        let position = *self.table.get(index)?;
        self.entries.get(position).map(|entry| &entry.value)
    }

    fn object_mut(&mut self, index: SlotIndex) -> Option<&mut T> {
        let position = *self.table.get(index)?;
        self.entries.get_mut(position).map(|entry| &mut entry.value)
    }

    fn reclaim(&mut self, index: SlotIndex) -> Option<T> {
        let position = self.table.release_slot(index)?;
        if position >= self.entries.len() {
            debug_assert!(false, "slot {index} points past the entries");
            return None;
        }
        let entry = self.entries.remove(position);
        self.reindex_from(position);
        Some(entry.value)
    }
}
