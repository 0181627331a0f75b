//! The storage seam between containers and handles.
//!
//! A container keeps its state in a type implementing [`SlotStore`] and
//! wraps it in a [`Moon`](crate::Moon). Handles never see the concrete
//! store; they reach it through the moon's lock and drive the reference
//! counting protocol with the provided methods here.

use crate::id::{SlotIndex, SlotKey};
use crate::ledger::{Decrement, GenerationLedger, RefKind};

/// Storage that hands out generation-tagged slots.
pub trait SlotStore {
    /// The object type stored in live slots.
    type Value;

    /// Ledger of the slot at `index`.
    fn ledger(&self, index: SlotIndex) -> Option<&GenerationLedger>;

    /// Mutable ledger of the slot at `index`.
    fn ledger_mut(&mut self, index: SlotIndex) -> Option<&mut GenerationLedger>;

    /// Object stored in the live slot at `index`, without a generation
    /// check.
    fn object(&self, index: SlotIndex) -> Option<&Self::Value>;

    /// Mutable object in the live slot at `index`, without a generation
    /// check.
    fn object_mut(&mut self, index: SlotIndex) -> Option<&mut Self::Value>;

    /// Destroy the object in `index` and return its slot to the free list.
    ///
    /// The object is handed back rather than dropped, so callers can run
    /// its destructor after releasing the container lock.
    fn reclaim(&mut self, index: SlotIndex) -> Option<Self::Value>;

    /// True if `key` names the live generation of its slot.
    fn is_current(&self, key: SlotKey) -> bool {
        self.ledger(key.index)
            .is_some_and(|ledger| ledger.match_generation(key.generation))
    }

    /// Object behind `key`, if the key is current.
    fn resolve(&self, key: SlotKey) -> Option<&Self::Value> {
        if self.is_current(key) {
            self.object(key.index)
        } else {
            None
        }
    }

    /// Mutable object behind `key`, if the key is current.
    fn resolve_mut(&mut self, key: SlotKey) -> Option<&mut Self::Value> {
        if self.is_current(key) {
            self.object_mut(key.index)
        } else {
            None
        }
    }

    /// Add a reference of `kind` to a current key.
    ///
    /// Returns `false` without touching any count when the key is stale.
    fn acquire(&mut self, key: SlotKey, kind: RefKind) -> bool {
        self.ledger_mut(key.index)
            .is_some_and(|ledger| ledger.increment(key.generation, kind))
    }

    /// Drop a reference of `kind`, destroying the object if it was the
    /// last strong reference to the live generation.
    fn release(&mut self, key: SlotKey, kind: RefKind) -> Option<Self::Value> {
        let ledger = self.ledger_mut(key.index)?;
        match ledger.decrement_generation(key.generation, kind) {
            Decrement::Expired => self.reclaim(key.index),
            Decrement::Retained => None,
        }
    }
}
