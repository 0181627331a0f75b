//! Strong and weak handles.
//!
//! A handle is either empty or bound to a `(moon, slot, generation)`
//! triple. Cloning re-validates against the store and takes a new count,
//! falling back to an empty handle when the generation has gone stale.
//! Dropping releases the count; releasing the last strong count destroys
//! the object and frees its slot. Destructors always run after the store
//! lock has been released, so an object may itself own handles into the
//! same container.
//!
//! Every access goes through the container lock. Calling back into the
//! same container from inside a [`Handle::with`] closure (including
//! dropping a handle into it) panics under [`NoLock`] and deadlocks under
//! a real mutex.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::lock_api::RawMutex;

use crate::id::SlotKey;
use crate::ledger::RefKind;
use crate::lock::NoLock;
use crate::moon::Moon;
use crate::store::SlotStore;

struct Binding<S, R: RawMutex> {
    moon: Weak<Moon<S, R>>,
    key: SlotKey,
}

impl<S: SlotStore, R: RawMutex> Binding<S, R> {
    fn new(moon: &Arc<Moon<S, R>>, key: SlotKey) -> Self {
        Self {
            moon: Arc::downgrade(moon),
            key,
        }
    }

    fn acquire(&self, kind: RefKind) -> Option<Self> {
        let moon = self.moon.upgrade()?;
        let acquired = moon.lock().acquire(self.key, kind);
        acquired.then(|| Self {
            moon: self.moon.clone(),
            key: self.key,
        })
    }

    fn release(self, kind: RefKind) {
        let Some(moon) = self.moon.upgrade() else {
            return;
        };
        let reclaimed = moon.lock().release(self.key, kind);
        drop(reclaimed);
    }

    /// Take a `to` count and drop the `from` count under one lock.
    fn convert(self, from: RefKind, to: RefKind) -> Option<Self> {
        let moon = self.moon.upgrade()?;
        let (acquired, reclaimed) = {
            let mut store = moon.lock();
            let acquired = store.acquire(self.key, to);
            (acquired, store.release(self.key, from))
        };
        drop(reclaimed);
        acquired.then_some(self)
    }

    fn is_valid(&self) -> bool {
        let Some(moon) = self.moon.upgrade() else {
            return false;
        };
        let current = moon.lock().is_current(self.key);
        current
    }

    fn with<U>(&self, f: impl FnOnce(&S::Value) -> U) -> Option<U> {
        let moon = self.moon.upgrade()?;
        let store = moon.lock();
        let value = store.resolve(self.key)?;
        Some(f(value))
    }

    fn with_mut<U>(&self, f: impl FnOnce(&mut S::Value) -> U) -> Option<U> {
        let moon = self.moon.upgrade()?;
        let mut store = moon.lock();
        let value = store.resolve_mut(self.key)?;
        Some(f(value))
    }

    fn identity(&self) -> (usize, SlotKey) {
        (self.moon.as_ptr().cast::<()>() as usize, self.key)
    }
}

fn same_binding<S, R: RawMutex>(a: &Option<Binding<S, R>>, b: &Option<Binding<S, R>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Weak::ptr_eq(&a.moon, &b.moon) && a.key == b.key,
        _ => false,
    }
}

fn bound_to<S, R: RawMutex>(binding: &Option<Binding<S, R>>, moon: &Arc<Moon<S, R>>) -> bool {
    binding
        .as_ref()
        .is_some_and(|b| std::ptr::eq(b.moon.as_ptr(), Arc::as_ptr(moon)))
}

/// Owning handle: keeps its object alive while bound and current.
#[must_use]
pub struct Handle<S: SlotStore, R: RawMutex = NoLock> {
    binding: Option<Binding<S, R>>,
}

impl<S: SlotStore, R: RawMutex> Handle<S, R> {
    /// Adopt the strong count stamped by a fresh generation.
    ///
    /// Containers call this right after inserting; the count must not be
    /// adopted twice.
    #[doc(hidden)]
    pub fn from_issued(moon: &Arc<Moon<S, R>>, key: SlotKey) -> Self {
        Self {
            binding: Some(Binding::new(moon, key)),
        }
    }

    /// A handle bound to nothing.
    pub fn empty() -> Self {
        Self { binding: None }
    }

    /// True if the handle is bound to nothing.
    pub fn is_empty(&self) -> bool {
        self.binding.is_none()
    }

    /// The slot key this handle is bound to, stale or not.
    pub fn key(&self) -> Option<SlotKey> {
        self.binding.as_ref().map(|b| b.key)
    }

    /// True if the container is alive and the object has not been
    /// destroyed.
    pub fn is_valid(&self) -> bool {
        self.binding.as_ref().is_some_and(Binding::is_valid)
    }

    /// Run `f` on the object under the container lock.
    ///
    /// Returns `None` if the handle is empty or stale.
    pub fn with<U>(&self, f: impl FnOnce(&S::Value) -> U) -> Option<U> {
        self.binding.as_ref()?.with(f)
    }

    /// Run `f` on the object mutably under the container lock.
    pub fn with_mut<U>(&self, f: impl FnOnce(&mut S::Value) -> U) -> Option<U> {
        self.binding.as_ref()?.with_mut(f)
    }

    /// A weak handle to the same object, or an empty one if this handle
    /// is stale.
    pub fn downgrade(&self) -> WeakHandle<S, R> {
        WeakHandle {
            binding: self
                .binding
                .as_ref()
                .and_then(|b| b.acquire(RefKind::Weak)),
        }
    }

    /// Trade this strong reference for a weak one.
    ///
    /// If this was the last strong reference the object is destroyed and
    /// the returned weak handle is already stale.
    pub fn into_weak(mut self) -> WeakHandle<S, R> {
        WeakHandle {
            binding: self
                .binding
                .take()
                .and_then(|b| b.convert(RefKind::Strong, RefKind::Weak)),
        }
    }

    /// Release the reference now, leaving the handle empty.
    pub fn reset(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.release(RefKind::Strong);
        }
    }

    /// True if this handle was issued by the container owning `moon`.
    pub fn belongs_to(&self, moon: &Arc<Moon<S, R>>) -> bool {
        bound_to(&self.binding, moon)
    }
}

impl<S: SlotStore, R: RawMutex> Clone for Handle<S, R> {
    fn clone(&self) -> Self {
        Self {
            binding: self
                .binding
                .as_ref()
                .and_then(|b| b.acquire(RefKind::Strong)),
        }
    }
}

impl<S: SlotStore, R: RawMutex> Drop for Handle<S, R> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<S: SlotStore, R: RawMutex> Default for Handle<S, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: SlotStore, R: RawMutex> PartialEq for Handle<S, R> {
    fn eq(&self, other: &Self) -> bool {
        same_binding(&self.binding, &other.binding)
    }
}

impl<S: SlotStore, R: RawMutex> Eq for Handle<S, R> {}

impl<S: SlotStore, R: RawMutex> Hash for Handle<S, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.binding.as_ref().map(Binding::identity).hash(state);
    }
}

impl<S: SlotStore, R: RawMutex> fmt::Debug for Handle<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            Some(b) => write!(f, "Handle({})", b.key),
            None => f.write_str("Handle(empty)"),
        }
    }
}

/// Non-owning handle: observes an object without keeping it alive.
#[must_use]
pub struct WeakHandle<S: SlotStore, R: RawMutex = NoLock> {
    binding: Option<Binding<S, R>>,
}

impl<S: SlotStore, R: RawMutex> WeakHandle<S, R> {
    /// A weak handle bound to nothing.
    pub fn empty() -> Self {
        Self { binding: None }
    }

    /// True if the handle is bound to nothing.
    pub fn is_empty(&self) -> bool {
        self.binding.is_none()
    }

    /// The slot key this handle is bound to, stale or not.
    pub fn key(&self) -> Option<SlotKey> {
        self.binding.as_ref().map(|b| b.key)
    }

    /// True until the last strong reference to the object is released.
    pub fn is_valid(&self) -> bool {
        self.binding.as_ref().is_some_and(Binding::is_valid)
    }

    /// Run `f` on the object under the container lock, if it still
    /// exists.
    pub fn with<U>(&self, f: impl FnOnce(&S::Value) -> U) -> Option<U> {
        self.binding.as_ref()?.with(f)
    }

    /// Run `f` on the object mutably under the container lock, if it
    /// still exists.
    pub fn with_mut<U>(&self, f: impl FnOnce(&mut S::Value) -> U) -> Option<U> {
        self.binding.as_ref()?.with_mut(f)
    }

    /// A strong handle to the object, or an empty one if it is gone.
    pub fn upgrade(&self) -> Handle<S, R> {
        Handle {
            binding: self
                .binding
                .as_ref()
                .and_then(|b| b.acquire(RefKind::Strong)),
        }
    }

    /// Trade this weak reference for a strong one.
    ///
    /// Returns an empty handle, releasing the weak count, if the object is
    /// gone.
    pub fn into_strong(mut self) -> Handle<S, R> {
        Handle {
            binding: self
                .binding
                .take()
                .and_then(|b| b.convert(RefKind::Weak, RefKind::Strong)),
        }
    }

    /// Release the reference now, leaving the handle empty.
    pub fn reset(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.release(RefKind::Weak);
        }
    }

    /// True if this handle was issued by the container owning `moon`.
    pub fn belongs_to(&self, moon: &Arc<Moon<S, R>>) -> bool {
        bound_to(&self.binding, moon)
    }
}

impl<S: SlotStore, R: RawMutex> Clone for WeakHandle<S, R> {
    fn clone(&self) -> Self {
        Self {
            binding: self
                .binding
                .as_ref()
                .and_then(|b| b.acquire(RefKind::Weak)),
        }
    }
}

impl<S: SlotStore, R: RawMutex> Drop for WeakHandle<S, R> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<S: SlotStore, R: RawMutex> Default for WeakHandle<S, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: SlotStore, R: RawMutex> PartialEq for WeakHandle<S, R> {
    fn eq(&self, other: &Self) -> bool {
        same_binding(&self.binding, &other.binding)
    }
}

impl<S: SlotStore, R: RawMutex> Eq for WeakHandle<S, R> {}

impl<S: SlotStore, R: RawMutex> Hash for WeakHandle<S, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.binding.as_ref().map(Binding::identity).hash(state);
    }
}

impl<S: SlotStore, R: RawMutex> fmt::Debug for WeakHandle<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            Some(b) => write!(f, "WeakHandle({})", b.key),
            None => f.write_str("WeakHandle(empty)"),
        }
    }
}

impl<S: SlotStore, R: RawMutex> From<Handle<S, R>> for WeakHandle<S, R> {
    fn from(handle: Handle<S, R>) -> Self {
        handle.into_weak()
    }
}

impl<S: SlotStore, R: RawMutex> From<WeakHandle<S, R>> for Handle<S, R> {
    fn from(handle: WeakHandle<S, R>) -> Self {
        handle.into_strong()
    }
}
