//! Moonslot: generational slot maps with reference-counted handles.
//!
//! This is the facade crate that re-exports the public API of the
//! moonslot sub-crates. For most users, adding `moonslot` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use moonslot::prelude::*;
//!
//! let lamps = SlotMap::new();
//! let desk = lamps.insert("desk");
//! let watcher = desk.downgrade();
//!
//! // Copies share the object; it lives until the last strong handle goes.
//! let copy = desk.clone();
//! drop(desk);
//! assert_eq!(copy.with(|name| name.len()), Some(4));
//! drop(copy);
//! assert!(!watcher.is_valid());
//!
//! // The ordered flavour keeps its objects sorted.
//! let scores = OrderedSlotMap::new();
//! let _handles = scores.insert_all([30, 10, 20]);
//! let sorted: Vec<i32> = scores.view().iter().copied().collect();
//! assert_eq!(sorted, vec![10, 20, 30]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `moonslot-core` | Ids, ledger, slot table, lock policies, handle protocol |
//! | [`map`] | `moonslot-map` | Dense [`SlotMap`](map::SlotMap) |
//! | [`ordered`] | `moonslot-ordered` | Sorted [`OrderedSlotMap`](ordered::OrderedSlotMap) |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, generation ledger, slot table and handle protocol
/// (`moonslot-core`).
///
/// Implement [`types::SlotStore`] to build a new container flavour on the
/// same handles.
pub use moonslot_core as types;

/// The dense slot map (`moonslot-map`).
pub use moonslot_map as map;

/// The sorted slot map (`moonslot-ordered`).
///
/// Supports container-held ownership through
/// [`ordered::OrderedSlotMap::own`].
pub use moonslot_ordered as ordered;

/// Common imports for typical moonslot usage.
///
/// Handle aliases are renamed per container so both flavours can be
/// imported together.
pub mod prelude {
    // Containers
    pub use moonslot_map::{SlotMap, SyncSlotMap};
    pub use moonslot_ordered::{OrderedSlotMap, SyncOrderedSlotMap};

    // Handles
    pub use moonslot_map::{Handle as SlotHandle, WeakHandle as WeakSlotHandle};
    pub use moonslot_ordered::{Handle as OrderedHandle, WeakHandle as WeakOrderedHandle};

    // Configuration, errors and lock policies
    pub use moonslot_core::{NoLock, SlotError, SlotMapConfig, SyncLock};
}
