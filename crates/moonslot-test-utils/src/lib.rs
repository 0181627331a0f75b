//! Test fixtures shared across the moonslot crates.
//!
//! - [`DropCounter`] / [`Tracked`] count how many values were destroyed,
//!   to check that containers drop each object exactly once.
//! - [`SlotData`] and [`sample_data`] are the two-field records used by
//!   the round-trip scenarios.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{sample_data, DropCounter, SlotData, Tracked};
