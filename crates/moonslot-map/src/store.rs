//! Backing store for [`SlotMap`](crate::SlotMap).

use moonslot_core::{
    GenerationLedger, Rejected, SlotIndex, SlotKey, SlotMapConfig, SlotError, SlotStore,
    SlotTable,
};

/// Objects stored directly in generation-tagged slots.
///
/// Storage order is slot index order, so iteration visits objects by
/// position in the table rather than by insertion time once slots have
/// been recycled.
#[derive(Debug)]
pub struct DenseStore<T> {
    table: SlotTable<T>,
}

impl<T> DenseStore<T> {
    pub(crate) fn with_config(config: &SlotMapConfig) -> Result<Self, SlotError> {
        Ok(Self {
            table: SlotTable::with_config(config)?,
        })
    }

    /// The underlying slot table.
    pub fn table(&self) -> &SlotTable<T> {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut SlotTable<T> {
        &mut self.table
    }

    pub(crate) fn insert(&mut self, value: T) -> Result<SlotKey, Rejected<T>> {
        self.table.insert(value)
    }

    /// Destroy the object behind a current key, whatever its counts.
    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<T> {
        if self.is_current(key) {
            self.table.release_slot(key.index)
        } else {
            None
        }
    }
}

impl<T> SlotStore for DenseStore<T> {
    type Value = T;

    fn ledger(&self, index: SlotIndex) -> Option<&GenerationLedger> {
        self.table.ledger(index)
    }

    fn ledger_mut(&mut self, index: SlotIndex) -> Option<&mut GenerationLedger> {
        self.table.ledger_mut(index)
    }

    fn object(&self, index: SlotIndex) -> Option<&T> {
        self.table.get(index)
    }

    fn object_mut(&mut self, index: SlotIndex) -> Option<&mut T> {
        self.table.get_mut(index)
    }

    fn reclaim(&mut self, index: SlotIndex) -> Option<T> {
        self.table.release_slot(index)
    }
}
