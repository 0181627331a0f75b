//! Lock policies for slot containers.
//!
//! Containers are generic over a [`RawMutex`] implementation. The
//! default, [`NoLock`], is a single-threaded flag that turns reentrant
//! access into a panic. [`SyncLock`] is `parking_lot`'s mutex, which makes
//! containers and handles shareable across threads.

#![allow(unsafe_code)]

use std::cell::Cell;

use parking_lot::lock_api::{GuardNoSend, RawMutex};

/// Thread-safe lock policy.
pub type SyncLock = parking_lot::RawMutex;

/// Single-threaded lock policy.
///
/// Holds a `Cell<bool>`, so any container using it is `!Sync` and its
/// handles are `!Send`. Since no other thread can hold the lock, a
/// `lock` call that finds it taken means the current thread re-entered
/// the container (for example by dropping a handle inside a `with`
/// closure), and it panics instead of blocking forever.
#[derive(Debug)]
pub struct NoLock {
    locked: Cell<bool>,
}

// SAFETY: `NoLock` is `!Sync`, so all calls come from the owning thread.
// `lock` and `try_lock` only hand out the lock while the flag is clear and
// set it before returning, so two guards never coexist. `unlock` is only
// called by a guard that holds the lock.
unsafe impl RawMutex for NoLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: NoLock = NoLock {
        locked: Cell::new(false),
    };

    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        if !self.try_lock() {
            panic!("slot container re-entered while locked");
        }
    }

    fn try_lock(&self) -> bool {
        if self.locked.get() {
            false
        } else {
            self.locked.set(true);
            true
        }
    }

    unsafe fn unlock(&self) {
        self.locked.set(false);
    }

    fn is_locked(&self) -> bool {
        self.locked.get()
    }
}
