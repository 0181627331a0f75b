//! Shared liveness cell between a container and its handles.
//!
//! The container owns the only strong `Arc` to its [`Moon`]; every handle
//! holds a `Weak`. When the container is dropped, the store inside the
//! moon goes with it and handle upgrades start failing, so outstanding
//! handles turn stale instead of dangling. The moon allocation itself is
//! freed once the last handle lets go.
//!
//! ```text
//!  SlotMap ──Arc──► Moon { lock: R, store: S } ◄──Weak── Handle
//!                                              ◄──Weak── WeakHandle
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::lock_api::{Mutex, MutexGuard, RawMutex};

use crate::lock::NoLock;

/// Lock-guarded store shared by a container and its handles.
pub struct Moon<S, R: RawMutex = NoLock> {
    store: Mutex<R, S>,
}

impl<S, R: RawMutex> Moon<S, R> {
    /// Wrap `store` in a new moon owned by the returned `Arc`.
    pub fn new(store: S) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
        })
    }

    /// Lock the store.
    ///
    /// With [`NoLock`] this panics if the store is already locked on the
    /// current thread; with a real mutex it blocks.
    pub fn lock(&self) -> MutexGuard<'_, R, S> {
        self.store.lock()
    }

    /// Number of handle bindings that still point at this moon.
    pub fn outstanding_handles(this: &Arc<Self>) -> usize {
        Arc::weak_count(this)
    }
}

impl<S, R: RawMutex> fmt::Debug for Moon<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Moon")
            .field("locked", &self.store.is_locked())
            .finish_non_exhaustive()
    }
}
