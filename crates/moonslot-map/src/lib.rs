//! Dense generational slot map.
//!
//! [`SlotMap`] stores objects in generation-tagged slots and hands out
//! reference-counted [`Handle`]s and [`WeakHandle`]s. A handle resolves
//! only while the generation it was issued under is still current, so a
//! recycled slot can never be reached through an old handle.
//!
//! ```
//! use moonslot_map::SlotMap;
//!
//! let map = SlotMap::new();
//! let strong = map.insert("lamp");
//! let weak = strong.downgrade();
//! assert_eq!(map.with(&strong, |v| v.len()), Some(4));
//!
//! drop(strong);
//! assert!(!weak.is_valid());
//! assert!(map.is_empty());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod map;
pub mod store;
pub mod view;

pub use map::{Guard, Handle, SlotMap, SyncSlotMap, WeakHandle};
pub use store::DenseStore;
pub use view::View;
