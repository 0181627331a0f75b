//! Error types for slot containers.
//!
//! Stale handles are not errors: lookups through them return `None` or
//! `false`. The variants here cover the conditions a caller can act on.

use std::error::Error;
use std::fmt;

/// Errors from slot container construction and growth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotError {
    /// The index table cannot grow to the requested number of slots.
    CapacityExceeded {
        /// Number of slots the operation needed.
        requested: usize,
        /// Configured slot limit.
        max: usize,
    },
    /// A [`SlotMapConfig`](crate::SlotMapConfig) failed validation.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { requested, max } => {
                write!(
                    f,
                    "slot capacity exceeded: requested {requested} slots, limit {max}"
                )
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid slot map config: {reason}")
            }
        }
    }
}

impl Error for SlotError {}

/// A value that could not be stored, handed back with the reason.
///
/// Returning the value lets the caller decide where it is dropped, which
/// matters when the value owns handles into the same container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejected<T> {
    /// Why the insert failed.
    pub error: SlotError,
    /// The value that was not stored.
    pub value: T,
}

impl<T> Rejected<T> {
    /// Take back the value, discarding the error.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value rejected: {}", self.error)
    }
}

impl<T: fmt::Debug> Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Unwrap a container result, panicking with the error's message.
///
/// Backs the infallible container methods such as `insert`, which fail
/// only once the slot limit is reached.
#[track_caller]
pub fn or_panic<V>(result: Result<V, SlotError>) -> V {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_names_both_sizes() {
        let err = SlotError::CapacityExceeded {
            requested: 9,
            max: 8,
        };
        assert_eq!(
            err.to_string(),
            "slot capacity exceeded: requested 9 slots, limit 8"
        );
    }

    #[test]
    fn or_panic_passes_values_through() {
        assert_eq!(or_panic(Ok::<_, SlotError>(3)), 3);
    }

    #[test]
    #[should_panic(expected = "invalid slot map config: zero")]
    fn or_panic_uses_error_message() {
        let failed: Result<(), SlotError> = Err(SlotError::InvalidConfig {
            reason: "zero".into(),
        });
        or_panic(failed);
    }
}
