//! Core building blocks for moonslot containers.
//!
//! This is the leaf crate of the workspace. It holds everything the
//! container flavours share: slot identifiers, the per-slot generation
//! ledger, the free-list slot table, the lock policies, the moon that
//! links a container to its handles, and the handles themselves.
//!
//! # Architecture
//!
//! ```text
//! Container (SlotMap / OrderedSlotMap)
//! └── Arc<Moon<Store, R>>            lock policy R: NoLock | SyncLock
//!     └── Store: SlotStore
//!         └── SlotTable<P>
//!             └── TableSlot { GenerationLedger, SlotState<P> }
//!
//! Handle / WeakHandle ──Weak──► Moon
//! ```
//!
//! A handle resolves in three steps: upgrade the moon (container still
//! alive?), lock it, then ask the slot's ledger whether the handle's
//! generation is current.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handle;
pub mod id;
pub mod ledger;
pub mod lock;
pub mod moon;
pub mod store;
pub mod table;

pub use config::SlotMapConfig;
pub use error::{or_panic, Rejected, SlotError};
pub use handle::{Handle, WeakHandle};
pub use id::{Generation, SlotIndex, SlotKey};
pub use ledger::{Decrement, GenerationCounts, GenerationLedger, RefKind, INLINE_GENERATIONS};
pub use lock::{NoLock, SyncLock};
pub use moon::Moon;
pub use store::SlotStore;
pub use table::{SlotState, SlotTable, TableSlot};

/// Re-export of the lock traits containers are generic over.
pub use parking_lot::lock_api;
