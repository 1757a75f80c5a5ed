//! The registry's single process-wide lock.
//!
//! A [`Gate`] wraps the state it protects. It starts out closed: the state
//! exists but cannot be reached until [`Gate::create`] opens the gate, and
//! [`Gate::destroy`] closes it again after draining any current holder.
//!
//! # Reentrancy
//!
//! The gate is **not** reentrant. Calling [`Gate::lock`] (or anything in the
//! registry that takes it) from a thread that already holds a [`GateGuard`]
//! deadlocks. Callbacks run while the gate is held must not call back into
//! the registry.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{Error, Result};

struct Slot<T> {
    open: bool,
    creations: u32,
    value: T,
}

/// Lazily opened, explicitly closed mutex around `T`.
pub struct Gate<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Gate<T> {
    /// Create a closed gate guarding `value`.
    pub const fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                open: false,
                creations: 0,
                value,
            }),
        }
    }

    /// Open the gate. Idempotent: an already open gate is left untouched.
    pub fn create(&self) -> Result<()> {
        let mut slot = self.acquire();
        if !slot.open {
            slot.open = true;
            slot.creations += 1;
            debug!(creations = slot.creations, "Gate created");
        }
        Ok(())
    }

    /// Close the gate.
    ///
    /// Blocks until any current holder has released it, then closes it so
    /// that subsequent [`Gate::lock`] calls fail with
    /// [`Error::NotInitialised`]. Closing a closed gate does nothing.
    pub fn destroy(&self) {
        let mut slot = self.acquire();
        if slot.open {
            slot.open = false;
            debug!("Gate destroyed");
        }
    }

    /// Returns `true` between [`Gate::create`] and [`Gate::destroy`].
    pub fn is_created(&self) -> bool {
        self.acquire().open
    }

    /// Number of times the gate went from closed to open.
    pub fn creations(&self) -> u32 {
        self.acquire().creations
    }

    /// Take the gate, blocking until it is free.
    ///
    /// The gate is released when the returned guard is dropped, whichever
    /// path the caller leaves by.
    pub fn lock(&self) -> Result<GateGuard<'_, T>> {
        let slot = self.acquire();
        if !slot.open {
            return Err(Error::NotInitialised);
        }
        Ok(GateGuard { slot })
    }

    /// Run `f` with the gate held.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Exclusive access without locking, open or not.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self
            .slot
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .value
    }

    fn acquire(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Gate poisoned by a panicking holder, recovering");
            poisoned.into_inner()
        })
    }
}

impl<T: Default> Default for Gate<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Proof that the gate is held; derefs to the guarded state.
pub struct GateGuard<'a, T> {
    slot: MutexGuard<'a, Slot<T>>,
}

impl<T> Deref for GateGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.slot.value
    }
}

impl<T> DerefMut for GateGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.slot.value
    }
}
