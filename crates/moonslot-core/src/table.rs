//! Generation-tagged slot table with an intrusive free list.
//!
//! [`SlotTable`] is the allocator and recycler shared by both container
//! flavours. Every slot owns a [`GenerationLedger`] and is either live
//! (holding a payload), free (holding the next free-list link), or
//! retired (generation ids exhausted, never reused).
//!
//! ```text
//!  slots:  [ Live(a) ][ Free ─┐ ][ Live(b) ][ Free ─┐ ][ Free ─> None ]
//!                       ▲     └───────────────▲      └──────▲
//!  free_head ───────────┘                                    │
//!  free_tail ────────────────────────────────────────────────┘
//! ```
//!
//! Released slots go to the front of the free list. Growth appends a new
//! contiguous run of free slots at the back. Existing indices are never
//! renumbered.

use log::{debug, trace, warn};

use crate::config::SlotMapConfig;
use crate::error::{Rejected, SlotError};
use crate::id::{SlotIndex, SlotKey};
use crate::ledger::GenerationLedger;

/// Occupancy of one slot.
#[derive(Clone, Debug)]
pub enum SlotState<P> {
    /// Holds a payload for the ledger's current generation.
    Live(P),
    /// Free-list node.
    Free {
        /// Next free slot, if any.
        next: Option<SlotIndex>,
    },
    /// Generation ids are exhausted; the slot is never reused.
    Retired,
}

/// One cell of the index table.
#[derive(Clone, Debug)]
pub struct TableSlot<P> {
    ledger: GenerationLedger,
    state: SlotState<P>,
}

impl<P> TableSlot<P> {
    fn free(next: Option<SlotIndex>) -> Self {
        Self {
            ledger: GenerationLedger::new(),
            state: SlotState::Free { next },
        }
    }

    /// The slot's generation ledger.
    pub fn ledger(&self) -> &GenerationLedger {
        &self.ledger
    }

    /// The slot's occupancy.
    pub fn state(&self) -> &SlotState<P> {
        &self.state
    }
}

/// Generation-tagged slots plus the free list threaded through them.
#[derive(Clone, Debug)]
pub struct SlotTable<P> {
    slots: Vec<TableSlot<P>>,
    free_head: Option<SlotIndex>,
    free_tail: Option<SlotIndex>,
    live: usize,
    max_slots: usize,
}

impl<P> SlotTable<P> {
    /// Build a table from a validated config, creating
    /// `initial_capacity` free slots.
    pub fn with_config(config: &SlotMapConfig) -> Result<Self, SlotError> {
        config.validate()?;
        let mut table = Self {
            slots: Vec::new(),
            free_head: None,
            free_tail: None,
            live: 0,
            max_slots: config.max_slots,
        };
        table.extend(config.initial_capacity)?;
        Ok(table)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when no slot is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total number of slots, live or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Configured slot limit.
    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Number of slots on the free list.
    pub fn free_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::Free { .. }))
            .count()
    }

    /// Head of the free list: the slot the next allocation will use.
    pub fn free_head(&self) -> Option<SlotIndex> {
        self.free_head
    }

    /// Slot at `index`, if it exists.
    pub fn slot(&self, index: SlotIndex) -> Option<&TableSlot<P>> {
        self.slots.get(index.as_usize())
    }

    /// Ledger of the slot at `index`.
    pub fn ledger(&self, index: SlotIndex) -> Option<&GenerationLedger> {
        self.slot(index).map(|s| &s.ledger)
    }

    /// Mutable ledger of the slot at `index`.
    pub fn ledger_mut(&mut self, index: SlotIndex) -> Option<&mut GenerationLedger> {
        self.slots.get_mut(index.as_usize()).map(|s| &mut s.ledger)
    }

    /// Payload of a live slot.
    pub fn get(&self, index: SlotIndex) -> Option<&P> {
        match &self.slots.get(index.as_usize())?.state {
            SlotState::Live(payload) => Some(payload),
            _ => None,
        }
    }

    /// Mutable payload of a live slot.
    pub fn get_mut(&mut self, index: SlotIndex) -> Option<&mut P> {
        match &mut self.slots.get_mut(index.as_usize())?.state {
            SlotState::Live(payload) => Some(payload),
            _ => None,
        }
    }

    /// True if `key` names the live generation of its slot.
    pub fn is_current(&self, key: SlotKey) -> bool {
        self.ledger(key.index)
            .is_some_and(|ledger| ledger.match_generation(key.generation))
    }

    /// Append `n` free slots as one run linked onto the free-list tail.
    pub fn extend(&mut self, n: usize) -> Result<(), SlotError> {
        if n == 0 {
            return Ok(());
        }
        let old = self.slots.len();
        let requested = old.saturating_add(n);
        if requested > self.max_slots {
            return Err(SlotError::CapacityExceeded {
                requested,
                max: self.max_slots,
            });
        }

        // Indices fit in u32: `requested <= max_slots <= MAX_SLOTS`.
        let first = SlotIndex(old as u32);
        self.slots.reserve(n);
        for i in old..requested {
            let next = (i + 1 < requested).then(|| SlotIndex((i + 1) as u32));
            self.slots.push(TableSlot::free(next));
        }
        let last = SlotIndex((requested - 1) as u32);

        match self.free_tail {
            Some(tail) => self.set_next(tail, Some(first)),
            None => self.free_head = Some(first),
        }
        self.free_tail = Some(last);
        debug!("slot table grew from {old} to {requested} slots");
        Ok(())
    }

    /// Grow to `n` slots. Never shrinks.
    pub fn resize(&mut self, n: usize) -> Result<(), SlotError> {
        let len = self.slots.len();
        if n > len {
            self.extend(n - len)
        } else {
            Ok(())
        }
    }

    /// Reserve backing storage for `additional` more slots.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    /// Pop the head of the free list, doubling capacity first if the list
    /// is empty.
    pub fn allocate_slot(&mut self) -> Result<SlotIndex, SlotError> {
        if self.free_head.is_none() {
            self.grow()?;
        }
        let Some(index) = self.free_head else {
            return Err(SlotError::CapacityExceeded {
                requested: self.slots.len() + 1,
                max: self.max_slots,
            });
        };
        let next = match self.slots[index.as_usize()].state {
            SlotState::Free { next } => next,
            _ => None,
        };
        self.free_head = next;
        if next.is_none() {
            self.free_tail = None;
        }
        Ok(index)
    }

    /// Store `payload` in a fresh slot and stamp a new generation.
    ///
    /// On failure the payload is handed back inside [`Rejected`].
    pub fn insert(&mut self, payload: P) -> Result<SlotKey, Rejected<P>> {
        loop {
            let index = match self.allocate_slot() {
                Ok(index) => index,
                Err(error) => {
                    return Err(Rejected {
                        error,
                        value: payload,
                    })
                }
            };
            let slot = &mut self.slots[index.as_usize()];
            match slot.ledger.new_generation() {
                Some(generation) => {
                    slot.state = SlotState::Live(payload);
                    self.live += 1;
                    return Ok(SlotKey::new(index, generation));
                }
                None => {
                    warn!("slot {index} cannot issue a generation; retiring it");
                    slot.state = SlotState::Retired;
                }
            }
        }
    }

    /// Take the payload out of a live slot and push the slot onto the
    /// front of the free list.
    ///
    /// The payload is returned so the caller controls where its destructor
    /// runs. Returns `None` if the slot is not live.
    pub fn release_slot(&mut self, index: SlotIndex) -> Option<P> {
        let head = self.free_head;
        let slot = self.slots.get_mut(index.as_usize())?;
        if !matches!(slot.state, SlotState::Live(_)) {
            return None;
        }
        slot.ledger.set_invalid();

        let retire = slot.ledger.is_exhausted();
        let next_state = if retire {
            SlotState::Retired
        } else {
            SlotState::Free { next: head }
        };
        let payload = match std::mem::replace(&mut slot.state, next_state) {
            SlotState::Live(payload) => payload,
            _ => return None,
        };

        if retire {
            warn!("slot {index} exhausted its generation ids and was retired");
        } else {
            self.free_head = Some(index);
            if self.free_tail.is_none() {
                self.free_tail = Some(index);
            }
        }
        self.live -= 1;
        Some(payload)
    }

    /// Release every live slot and rebuild the free list in index order.
    ///
    /// Returns the payloads in index order.
    pub fn clear(&mut self) -> Vec<P> {
        let live: Vec<SlotIndex> = self.live_indices().collect();
        let payloads: Vec<P> = live
            .into_iter()
            .filter_map(|index| self.release_slot(index))
            .collect();
        self.defragment();
        trace!("cleared {} live slots", payloads.len());
        payloads
    }

    /// Rebuild the free list so free slots are visited in index order.
    pub fn defragment(&mut self) {
        let mut head = None;
        let mut tail = None;
        for i in (0..self.slots.len()).rev() {
            if let SlotState::Free { next } = &mut self.slots[i].state {
                *next = head;
                head = Some(SlotIndex(i as u32));
                if tail.is_none() {
                    tail = head;
                }
            }
        }
        self.free_head = head;
        self.free_tail = tail;
        trace!("rebuilt free list in index order");
    }

    /// Drop trailing free slots that no handle can refer to, then shrink
    /// the backing storage.
    pub fn shrink_to_fit(&mut self) {
        let removable = self
            .slots
            .iter()
            .rev()
            .take_while(|s| matches!(s.state, SlotState::Free { .. }) && s.ledger.is_idle())
            .count();
        if removable > 0 {
            let keep = self.slots.len() - removable;
            self.slots.truncate(keep);
            self.defragment();
            debug!("trimmed {removable} trailing free slots");
        }
        self.slots.shrink_to_fit();
    }

    /// Indices of live slots in ascending order.
    pub fn live_indices(&self) -> impl DoubleEndedIterator<Item = SlotIndex> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.state, SlotState::Live(_)))
            .map(|(i, _)| SlotIndex(i as u32))
    }

    /// Live payloads in index order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (SlotIndex, &P)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.state {
                SlotState::Live(payload) => Some((SlotIndex(i as u32), payload)),
                _ => None,
            })
    }

    /// Mutable live payloads in index order.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (SlotIndex, &mut P)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| match &mut s.state {
                SlotState::Live(payload) => Some((SlotIndex(i as u32), payload)),
                _ => None,
            })
    }

    fn grow(&mut self) -> Result<(), SlotError> {
        let len = self.slots.len();
        let room = self.max_slots.saturating_sub(len);
        if room == 0 {
            return Err(SlotError::CapacityExceeded {
                requested: len.saturating_add(1),
                max: self.max_slots,
            });
        }
        self.extend(len.max(1).min(room))
    }

    fn set_next(&mut self, index: SlotIndex, link: Option<SlotIndex>) {
        if let Some(TableSlot {
            state: SlotState::Free { next },
            ..
        }) = self.slots.get_mut(index.as_usize())
        {
            *next = link;
        }
    }

    #[cfg(test)]
    pub(crate) fn ledger_for_test(&mut self, index: SlotIndex) -> &mut GenerationLedger {
        &mut self.slots[index.as_usize()].ledger
    }
}
