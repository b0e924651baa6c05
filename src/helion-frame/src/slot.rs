//! Slot-indexed mutable state.
//!
//! Every node keeps its per-worker scratch in a [`SlotVec`]: one entry per
//! slot, each behind its own lock. During the event loop a slot's entry is
//! only ever touched by the worker owning that slot, so the locks are
//! uncontended; they exist to keep the sharing safe without `unsafe`.

use std::sync::{Mutex, PoisonError, RwLock};

use common_error::{HelionError, HelionResult};

/// Per-slot state container with an init/use/drain lifecycle.
///
/// State is allocated with [`SlotVec::init`] (or `init_with`) immediately
/// before the event loop, accessed with [`SlotVec::with`] during it, and
/// consumed with [`SlotVec::drain`] at merge time or dropped with
/// [`SlotVec::clear`].
#[derive(Debug, Default)]
pub(crate) struct SlotVec<T> {
    slots: RwLock<Vec<Mutex<T>>>,
}

impl<T> SlotVec<T> {
    /// Create an empty, uninitialized container.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Allocate `n_slots` entries, one per slot.
    pub fn init(&self, n_slots: usize, make: impl Fn() -> T) -> HelionResult<()> {
        self.init_with(n_slots, |_| Ok(make()))
    }

    /// Allocate `n_slots` entries with a fallible, slot-aware constructor.
    pub fn init_with(
        &self,
        n_slots: usize,
        mut make: impl FnMut(usize) -> HelionResult<T>,
    ) -> HelionResult<()> {
        let mut slots = Vec::with_capacity(n_slots);
        for slot in 0..n_slots {
            slots.push(Mutex::new(make(slot)?));
        }
        *self.slots.write().unwrap_or_else(PoisonError::into_inner) = slots;
        Ok(())
    }

    /// Run `f` with exclusive access to one slot's entry.
    pub fn with<R>(&self, slot: usize, f: impl FnOnce(&mut T) -> R) -> HelionResult<R> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let entry = slots.get(slot).ok_or_else(|| {
            HelionError::internal(format!(
                "slot {slot} out of range ({} slots allocated)",
                slots.len()
            ))
        })?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut guard))
    }

    /// Take all entries in slot-id order, leaving the container empty.
    pub fn drain(&self) -> Vec<T> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *slots)
            .into_iter()
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of allocated slots.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
