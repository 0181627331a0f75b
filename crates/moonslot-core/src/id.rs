//! Strongly-typed slot identifiers.

use std::fmt;

/// Position of a slot in a container's index table.
///
/// Indices are stable for the lifetime of the slot: growth appends new
/// slots and never renumbers existing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub u32);

impl SlotIndex {
    /// The index as a `usize`, for indexing backing vectors.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Epoch tag stamped on a slot each time it becomes live.
///
/// Generations of one slot increase monotonically for as long as the slot
/// exists, including across free/reuse cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u32);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Generation {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A slot index paired with the generation it was issued under.
///
/// This is the identity a handle carries. Two keys with the same index but
/// different generations never refer to the same object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    /// Slot position in the index table.
    pub index: SlotIndex,
    /// Generation the slot had when the key was issued.
    pub generation: Generation,
}

impl SlotKey {
    /// Build a key from its parts.
    pub fn new(index: SlotIndex, generation: Generation) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_shows_index_and_generation() {
        let key = SlotKey::new(SlotIndex(7), Generation(3));
        assert_eq!(key.to_string(), "7v3");
    }

    #[test]
    fn keys_order_by_index_first() {
        let a = SlotKey::new(SlotIndex(1), Generation(9));
        let b = SlotKey::new(SlotIndex(2), Generation(0));
        assert!(a < b);
    }
}
