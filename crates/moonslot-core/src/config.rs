//! Container configuration parameters.

use crate::error::SlotError;

/// Configuration for a slot container.
///
/// Both container flavours accept the same config. Validated at
/// construction; the values are fixed for the container's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotMapConfig {
    /// Number of free slots created up front.
    ///
    /// Default: 50. Zero is allowed; the first insert then grows the
    /// table to a single slot and doubling proceeds from there.
    pub initial_capacity: usize,

    /// Upper bound on the number of slots the index table may hold.
    ///
    /// Default: [`SlotMapConfig::MAX_SLOTS`], the whole `u32` index space.
    /// Inserting past this limit fails with
    /// [`SlotError::CapacityExceeded`].
    pub max_slots: usize,
}

impl SlotMapConfig {
    /// Default number of slots allocated at construction.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 50;

    /// Largest slot count addressable by a [`SlotIndex`](crate::SlotIndex).
    pub const MAX_SLOTS: usize = u32::MAX as usize;

    /// Create a config with the given initial capacity.
    ///
    /// The slot limit defaults to [`Self::MAX_SLOTS`].
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            max_slots: Self::MAX_SLOTS,
        }
    }

    /// Set the slot limit.
    pub fn max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Check the config for internal consistency.
    pub fn validate(&self) -> Result<(), SlotError> {
        if self.max_slots == 0 {
            return Err(SlotError::InvalidConfig {
                reason: "max_slots must be at least 1".into(),
            });
        }
        if self.max_slots > Self::MAX_SLOTS {
            return Err(SlotError::InvalidConfig {
                reason: format!(
                    "max_slots {} exceeds the index space of {}",
                    self.max_slots,
                    Self::MAX_SLOTS
                ),
            });
        }
        if self.initial_capacity > self.max_slots {
            return Err(SlotError::InvalidConfig {
                reason: format!(
                    "initial_capacity {} exceeds max_slots {}",
                    self.initial_capacity, self.max_slots
                ),
            });
        }
        Ok(())
    }
}

impl Default for SlotMapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_CAPACITY)
    }
}
