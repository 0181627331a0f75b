//! Sorted generational slot map.
//!
//! [`OrderedSlotMap`] keeps its objects in comparator order while handing
//! out the same reference-counted handles as the dense map. Besides
//! caller handles, the container can hold a strong count on an object
//! itself, keeping it alive until the container releases it.
//!
//! ```
//! use moonslot_ordered::OrderedSlotMap;
//!
//! let map = OrderedSlotMap::new();
//! let late = map.insert(30);
//! let _early = map.insert(10);
//! let owned = map.insert_owned(20);
//! drop(owned);
//!
//! let values: Vec<i32> = map.view().iter().copied().collect();
//! assert_eq!(values, vec![10, 20, 30]);
//! assert_eq!(map.position(&late), Some(2));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod map;
pub mod store;
pub mod view;

pub use map::{Guard, Handle, OrderedSlotMap, SyncOrderedSlotMap, WeakHandle};
pub use store::OrderedStore;
pub use view::View;
