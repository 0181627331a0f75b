//! Per-slot generation bookkeeping.
//!
//! A [`GenerationLedger`] records, for one slot, every generation that
//! still has outstanding handles. Each generation carries independent
//! strong and weak counts. Only the current generation can gain
//! references; older generations linger until the handles issued under
//! them are dropped, so those handles can discover staleness and
//! decrement cleanly.
//!
//! ```text
//!   base                 base + len - 1 (current while valid)
//!    │                        │
//!    ▼                        ▼
//!  [ g5: s0 w1 ][ g6: s0 w0 ][ g7: s2 w1 ]
//!    ▲ trimmed when idle        ▲ trimmed when idle and last
//! ```
//!
//! Counts live in a [`SmallVec`] with [`INLINE_GENERATIONS`] inline
//! entries; the ledger spills to the heap only when more generations
//! are outstanding at once, and moves back inline after compaction.

use smallvec::SmallVec;

use crate::id::Generation;

/// Number of generations tracked without a heap allocation.
pub const INLINE_GENERATIONS: usize = 4;

/// Which counter a reference contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Keeps the object alive.
    Strong,
    /// Observes the object without keeping it alive.
    Weak,
}

/// Outcome of [`GenerationLedger::decrement_generation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decrement {
    /// Other references keep the object alive, or the decremented
    /// generation was already stale.
    Retained,
    /// The last strong reference to the live object was released. The
    /// caller must destroy the object and free the slot.
    Expired,
}

/// Strong and weak reference counts for one generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationCounts {
    /// Outstanding strong references.
    pub strong: u32,
    /// Outstanding weak references.
    pub weak: u32,
}

impl GenerationCounts {
    /// True when no reference of either kind remains.
    pub fn is_idle(&self) -> bool {
        self.strong == 0 && self.weak == 0
    }

    fn counter(&mut self, kind: RefKind) -> &mut u32 {
        match kind {
            RefKind::Strong => &mut self.strong,
            RefKind::Weak => &mut self.weak,
        }
    }
}

/// Generation history and reference counts for a single slot.
///
/// The tracked range is `[base, base + len)`. The ledger stays attached
/// to its slot across free/reuse cycles. A new generation takes the id
/// right after the tracked range, so ids trimmed from the back (which no
/// handle carries) are issued again and the range never has gaps. Only
/// when nothing is tracked does the slot move on to a fresh id.
#[derive(Clone, Debug, Default)]
pub struct GenerationLedger {
    counts: SmallVec<[GenerationCounts; INLINE_GENERATIONS]>,
    base: u32,
    next: u32,
    valid: bool,
}

impl GenerationLedger {
    /// Create a ledger for a slot that has never been live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the slot currently holds a live object.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark the current generation's object as destroyed.
    ///
    /// Outstanding counts are untouched; handles still decrement them
    /// when they are dropped.
    pub fn set_invalid(&mut self) {
        self.valid = false;
    }

    /// True when the slot can never issue another generation.
    pub fn is_exhausted(&self) -> bool {
        self.next == u32::MAX
    }

    /// True when no generation has outstanding references.
    pub fn is_idle(&self) -> bool {
        self.counts.is_empty()
    }

    /// Whether the counts have spilled out of inline storage.
    pub fn is_spilled(&self) -> bool {
        self.counts.spilled()
    }

    /// Oldest generation still tracked.
    pub fn base(&self) -> Generation {
        Generation(self.base)
    }

    /// Number of generations in the tracked range.
    pub fn tracked(&self) -> usize {
        self.counts.len()
    }

    /// The live generation, if the slot holds an object.
    pub fn current(&self) -> Option<Generation> {
        if self.valid {
            self.last().map(Generation)
        } else {
            None
        }
    }

    /// Start a new generation with one strong reference.
    ///
    /// Returns `None` if the slot is already live or has used up its
    /// generation ids.
    pub fn new_generation(&mut self) -> Option<Generation> {
        if self.valid || self.is_exhausted() {
            return None;
        }
        let id = if self.counts.is_empty() {
            self.base = self.next;
            self.next
        } else {
            self.base + self.counts.len() as u32
        };
        self.counts.push(GenerationCounts { strong: 1, weak: 0 });
        self.next = id + 1;
        self.valid = true;
        Some(Generation(id))
    }

    /// True iff `generation` is the live generation of this slot.
    pub fn match_generation(&self, generation: Generation) -> bool {
        self.valid && self.last() == Some(generation.0)
    }

    /// Counts for a tracked generation.
    pub fn counts(&self, generation: Generation) -> Option<GenerationCounts> {
        self.offset(generation).map(|off| self.counts[off])
    }

    /// Mutable counts for a tracked generation.
    ///
    /// Returns `None` outside the tracked range.
    pub fn get_generation_count(
        &mut self,
        generation: Generation,
    ) -> Option<&mut GenerationCounts> {
        let off = self.offset(generation)?;
        Some(&mut self.counts[off])
    }

    /// Add a reference to `generation` if it is still live.
    ///
    /// Returns `false`, leaving all counts untouched, for stale
    /// generations.
    pub fn increment(&mut self, generation: Generation, kind: RefKind) -> bool {
        if !self.match_generation(generation) {
            return false;
        }
        match self.get_generation_count(generation) {
            Some(counts) => {
                *counts.counter(kind) += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference to `generation`, compacting the ledger when the
    /// generation becomes idle.
    pub fn decrement_generation(&mut self, generation: Generation, kind: RefKind) -> Decrement {
        let is_current = self.match_generation(generation);
        let Some(counts) = self.get_generation_count(generation) else {
            debug_assert!(false, "decrement of untracked generation {generation}");
            return Decrement::Retained;
        };
        let counter = counts.counter(kind);
        if *counter == 0 {
            debug_assert!(false, "{kind:?} count underflow on generation {generation}");
            return Decrement::Retained;
        }
        *counter -= 1;

        let expired = kind == RefKind::Strong && is_current && counts.strong == 0;
        let idle = counts.is_idle();
        if expired {
            self.valid = false;
        }
        if idle {
            self.compact();
        }
        if expired {
            Decrement::Expired
        } else {
            Decrement::Retained
        }
    }

    fn last(&self) -> Option<u32> {
        if self.counts.is_empty() {
            None
        } else {
            Some(self.base + self.counts.len() as u32 - 1)
        }
    }

    fn offset(&self, generation: Generation) -> Option<usize> {
        let off = generation.0.checked_sub(self.base)? as usize;
        (off < self.counts.len()).then_some(off)
    }

    fn compact(&mut self) {
        let trailing = self
            .counts
            .iter()
            .rev()
            .take_while(|c| c.is_idle())
            .count();
        let keep = self.counts.len() - trailing;
        self.counts.truncate(keep);

        let leading = self.counts.iter().take_while(|c| c.is_idle()).count();
        if leading > 0 {
            self.counts.drain(..leading);
            self.base += leading as u32;
        }

        if self.counts.spilled() && self.counts.len() <= INLINE_GENERATIONS {
            self.counts.shrink_to_fit();
        }
    }

    #[cfg(test)]
    pub(crate) fn fast_forward(&mut self, next: u32) {
        assert!(self.counts.is_empty() && !self.valid);
        self.next = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(n: u32) -> Generation {
        Generation(n)
    }

    #[test]
    fn first_generation_is_zero_with_one_strong() {
        let mut ledger = GenerationLedger::new();
        assert_eq!(ledger.new_generation(), Some(g(0)));
        assert!(ledger.is_valid());
        assert!(ledger.match_generation(g(0)));
        assert_eq!(
            ledger.counts(g(0)),
            Some(GenerationCounts { strong: 1, weak: 0 })
        );
    }

    #[test]
    fn live_slot_refuses_second_generation() {
        let mut ledger = GenerationLedger::new();
        ledger.new_generation();
        assert_eq!(ledger.new_generation(), None);
    }

    #[test]
    fn last_strong_release_expires() {
        let mut ledger = GenerationLedger::new();
        let gen = ledger.new_generation().unwrap();
        assert!(ledger.increment(gen, RefKind::Strong));
        assert_eq!(
            ledger.decrement_generation(gen, RefKind::Strong),
            Decrement::Retained
        );
        assert_eq!(
            ledger.decrement_generation(gen, RefKind::Strong),
            Decrement::Expired
        );
        assert!(!ledger.is_valid());
        assert!(ledger.is_idle());
    }

    #[test]
    fn weak_reference_outlives_object() {
        let mut ledger = GenerationLedger::new();
        let gen = ledger.new_generation().unwrap();
        assert!(ledger.increment(gen, RefKind::Weak));
        assert_eq!(
            ledger.decrement_generation(gen, RefKind::Strong),
            Decrement::Expired
        );
        assert!(!ledger.match_generation(gen));
        assert_eq!(
            ledger.counts(gen),
            Some(GenerationCounts { strong: 0, weak: 1 })
        );
        // Weak handles never revive a dead generation.
        assert!(!ledger.increment(gen, RefKind::Weak));
    }

    #[test]
    fn front_trim_advances_base() {
        let mut ledger = GenerationLedger::new();
        let g0 = ledger.new_generation().unwrap();
        ledger.increment(g0, RefKind::Weak);
        ledger.decrement_generation(g0, RefKind::Strong);

        let g1 = ledger.new_generation().unwrap();
        assert_eq!(g1, g(1));
        assert_eq!(ledger.tracked(), 2);

        ledger.decrement_generation(g0, RefKind::Weak);
        assert_eq!(ledger.base(), g1);
        assert_eq!(ledger.tracked(), 1);
        assert!(ledger.match_generation(g1));
    }

    #[test]
    fn back_trimmed_id_is_reissued() {
        let mut ledger = GenerationLedger::new();
        let g0 = ledger.new_generation().unwrap();
        ledger.increment(g0, RefKind::Weak);
        ledger.decrement_generation(g0, RefKind::Strong);

        let g1 = ledger.new_generation().unwrap();
        ledger.decrement_generation(g1, RefKind::Strong);
        // g1 went idle as the last entry and was trimmed.
        assert_eq!(ledger.tracked(), 1);

        let again = ledger.new_generation().unwrap();
        assert_eq!(again, g1);
        assert_eq!(ledger.tracked(), 2);
        assert!(ledger.match_generation(again));
        assert!(!ledger.match_generation(g0));

        ledger.decrement_generation(g0, RefKind::Weak);
        assert_eq!(ledger.base(), g1);
        assert_eq!(ledger.tracked(), 1);
    }

    #[test]
    fn hot_slot_with_old_weak_reference_stays_inline() {
        let mut ledger = GenerationLedger::new();
        let g0 = ledger.new_generation().unwrap();
        ledger.increment(g0, RefKind::Weak);
        ledger.decrement_generation(g0, RefKind::Strong);

        for _ in 0..10_000 {
            let gen = ledger.new_generation().unwrap();
            assert!(ledger.tracked() <= INLINE_GENERATIONS);
            ledger.decrement_generation(gen, RefKind::Strong);
        }
        assert!(!ledger.is_spilled());
        assert_eq!(ledger.tracked(), 1);
        assert_eq!(ledger.counts(g0), Some(GenerationCounts { strong: 0, weak: 1 }));
    }

    #[test]
    fn spills_and_returns_inline() {
        let mut ledger = GenerationLedger::new();
        let mut held = Vec::new();
        for _ in 0..INLINE_GENERATIONS + 2 {
            let gen = ledger.new_generation().unwrap();
            ledger.increment(gen, RefKind::Weak);
            ledger.decrement_generation(gen, RefKind::Strong);
            held.push(gen);
        }
        assert!(ledger.is_spilled());
        for gen in held.drain(..3) {
            ledger.decrement_generation(gen, RefKind::Weak);
        }
        assert_eq!(ledger.tracked(), INLINE_GENERATIONS - 1);
        assert!(!ledger.is_spilled());
        for gen in held {
            ledger.decrement_generation(gen, RefKind::Weak);
        }
        assert!(ledger.is_idle());
    }

    #[test]
    fn stale_increment_is_refused() {
        let mut ledger = GenerationLedger::new();
        let g0 = ledger.new_generation().unwrap();
        ledger.decrement_generation(g0, RefKind::Strong);
        ledger.new_generation().unwrap();
        assert!(!ledger.increment(g0, RefKind::Strong));
        assert!(ledger.get_generation_count(g0).is_none());
    }

    #[test]
    fn exhausted_ledger_issues_nothing() {
        let mut ledger = GenerationLedger::new();
        ledger.fast_forward(u32::MAX - 1);
        let last = ledger.new_generation().unwrap();
        assert_eq!(last, g(u32::MAX - 1));
        ledger.decrement_generation(last, RefKind::Strong);
        assert!(ledger.is_exhausted());
        assert_eq!(ledger.new_generation(), None);
    }

    #[test]
    fn current_is_none_once_destroyed() {
        let mut ledger = GenerationLedger::new();
        let g0 = ledger.new_generation().unwrap();
        assert_eq!(ledger.current(), Some(g0));
        ledger.set_invalid();
        assert_eq!(ledger.current(), None);
        assert!(!ledger.match_generation(g0));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn counts_balance_and_expiry_is_exact(
                ops in proptest::collection::vec((0u8..4, any::<usize>()), 1..200),
            ) {
                let mut ledger = GenerationLedger::new();
                let mut held: Vec<(Generation, RefKind)> = Vec::new();
                let mut current: Option<Generation> = None;

                for (op, pick) in ops {
                    match op {
                        0 if current.is_none() => {
                            let gen = ledger.new_generation().unwrap();
                            held.push((gen, RefKind::Strong));
                            current = Some(gen);
                        }
                        1 | 2 if current.is_some() => {
                            let gen = current.unwrap();
                            let kind = if op == 1 { RefKind::Weak } else { RefKind::Strong };
                            prop_assert!(ledger.increment(gen, kind));
                            held.push((gen, kind));
                        }
                        3 if !held.is_empty() => {
                            let (gen, kind) = held.swap_remove(pick % held.len());
                            let last_strong = kind == RefKind::Strong
                                && Some(gen) == current
                                && !held.iter().any(|&(h, k)| h == gen && k == RefKind::Strong);
                            let outcome = ledger.decrement_generation(gen, kind);
                            prop_assert_eq!(outcome == Decrement::Expired, last_strong);
                            if last_strong {
                                current = None;
                            }
                        }
                        _ => {}
                    }
                    prop_assert_eq!(ledger.is_valid(), current.is_some());
                    prop_assert_eq!(ledger.current(), current);
                }

                for (gen, kind) in held.drain(..) {
                    ledger.decrement_generation(gen, kind);
                }
                prop_assert!(ledger.is_idle());
                prop_assert!(!ledger.is_valid());
                prop_assert!(!ledger.is_spilled());
            }
        }
    }
}
