//! The slot pool.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use modlink_core::{ComponentKey, ModuleId};
use tracing::{debug, info, warn};

use crate::error::{SlotError, SlotResult};
use crate::handle::{SlotHandle, SlotKind};

/// Counters describing the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of pooled slots in the roster.
    pub capacity: usize,
    /// Pooled slots with no binding.
    pub available: usize,
    /// Pooled slots with a binding.
    pub active: usize,
    /// Whether a singleton slot is configured.
    pub singleton_configured: bool,
    /// Whether the singleton slot is bound.
    pub singleton_bound: bool,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Every pooled slot, in roster order.
    roster: Vec<SlotHandle>,
    /// Unbound pooled slots. Acquire pops the front; release pushes the back.
    available: VecDeque<SlotHandle>,
    /// Key -> the pooled slot serving it.
    active: HashMap<ComponentKey, SlotHandle>,
    singleton: Option<SlotHandle>,
    singleton_binding: Option<ComponentKey>,
}

impl PoolState {
    fn release(&mut self, key: &ComponentKey) -> Option<SlotHandle> {
        let slot = self.active.remove(key)?;
        self.available.push_back(slot.clone());
        Some(slot)
    }
}

/// Maps logical components onto a fixed set of host-declared slots.
///
/// All pooled-slot state lives behind one mutex, so acquire, release and
/// re-acquire are each a single critical section. Every pooled slot is
/// always either available or bound to exactly one key, and a key is bound
/// to at most one slot.
///
/// There is no lease expiry: a key that is never released holds its slot
/// until it is released, its module is evicted, or the roster is replaced.
#[derive(Debug, Default)]
pub struct SlotPool {
    state: Mutex<PoolState>,
}

impl SlotPool {
    /// Create an empty, unconfigured pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Slot pool lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Register the singleton slot, replacing any previous one.
    ///
    /// A binding on the previous singleton is dropped.
    pub fn configure_singleton(&self, name: impl Into<String>) -> SlotHandle {
        let handle = SlotHandle::singleton(name.into());
        let mut state = self.lock();
        if let Some(key) = state.singleton_binding.take() {
            debug!(key = %key, "Dropping singleton binding on reconfigure");
        }
        state.singleton = Some(handle.clone());
        info!(slot = %handle, "Configured singleton slot");
        handle
    }

    /// Replace the pooled roster.
    ///
    /// Every existing pooled binding is dropped and the new slots become
    /// available in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::DuplicateSlot`] if a name repeats; the old roster
    /// is left in place.
    pub fn configure_pool<I, S>(&self, names: I) -> SlotResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut roster = Vec::new();
        for name in names {
            let name: String = name.into();
            if !seen.insert(name.clone()) {
                return Err(SlotError::DuplicateSlot(name));
            }
            roster.push(SlotHandle::pooled(name));
        }

        let mut state = self.lock();
        if !state.active.is_empty() {
            warn!(
                dropped = state.active.len(),
                "Replacing slot roster with live bindings"
            );
        }
        state.active.clear();
        state.available = roster.iter().cloned().collect();
        state.roster = roster;
        info!(capacity = state.roster.len(), "Configured slot pool");
        Ok(())
    }

    /// Bind `key` to a pooled slot.
    ///
    /// If `key` is already bound, returns the same slot. Otherwise takes the
    /// slot at the front of the available queue.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Exhausted`] if no slot is free. Nothing changes.
    pub fn acquire(&self, key: &ComponentKey) -> SlotResult<SlotHandle> {
        let mut state = self.lock();

        if let Some(slot) = state.active.get(key) {
            debug!(key = %key, slot = %slot, "Key already bound");
            return Ok(slot.clone());
        }

        let Some(slot) = state.available.pop_front() else {
            let capacity = state.roster.len();
            warn!(key = %key, capacity, "Slot pool exhausted");
            return Err(SlotError::Exhausted {
                key: key.clone(),
                capacity,
            });
        };

        state.active.insert(key.clone(), slot.clone());
        debug!(key = %key, slot = %slot, "Bound key to slot");
        Ok(slot)
    }

    /// Unbind `key` and return its slot to the back of the available queue.
    ///
    /// Returns the freed slot, or `None` if `key` was not bound.
    pub fn release(&self, key: &ComponentKey) -> Option<SlotHandle> {
        let released = self.lock().release(key);
        match &released {
            Some(slot) => debug!(key = %key, slot = %slot, "Released slot"),
            None => debug!(key = %key, "Release of unbound key ignored"),
        }
        released
    }

    /// The pooled slot bound to `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &ComponentKey) -> Option<SlotHandle> {
        self.lock().active.get(key).cloned()
    }

    /// The singleton slot.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unconfigured`] if none was configured.
    pub fn singleton(&self) -> SlotResult<SlotHandle> {
        self.lock()
            .singleton
            .clone()
            .ok_or(SlotError::Unconfigured(SlotKind::Singleton))
    }

    /// Bind `key` to the singleton slot.
    ///
    /// Returns the slot and the key it displaced, if a different one was
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unconfigured`] if no singleton is configured.
    pub fn bind_singleton(
        &self,
        key: &ComponentKey,
    ) -> SlotResult<(SlotHandle, Option<ComponentKey>)> {
        let mut state = self.lock();
        let slot = state
            .singleton
            .clone()
            .ok_or(SlotError::Unconfigured(SlotKind::Singleton))?;
        let displaced = state
            .singleton_binding
            .replace(key.clone())
            .filter(|old| old != key);
        if let Some(old) = &displaced {
            info!(key = %key, displaced = %old, slot = %slot, "Singleton slot rebound");
        }
        Ok((slot, displaced))
    }

    /// Unbind `key` from the singleton slot if it holds it.
    pub fn release_singleton(&self, key: &ComponentKey) -> bool {
        let mut state = self.lock();
        if state.singleton_binding.as_ref() == Some(key) {
            state.singleton_binding = None;
            true
        } else {
            false
        }
    }

    /// The key bound to the singleton slot, if any.
    #[must_use]
    pub fn singleton_binding(&self) -> Option<ComponentKey> {
        self.lock().singleton_binding.clone()
    }

    /// Every bound key for `class_name` in `module`, across instance tags,
    /// sorted.
    #[must_use]
    pub fn running_instances_for(&self, module: &ModuleId, class_name: &str) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self
            .lock()
            .active
            .keys()
            .filter(|key| key.is_instance_of(module, class_name))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Release every binding (pooled and singleton) owned by `module`.
    ///
    /// Pooled keys are released in sorted order, so their slots rejoin the
    /// available queue in that order. Returns the evicted keys in the same
    /// order, followed by the singleton key if it was evicted.
    pub fn evict_module(&self, module: &ModuleId) -> Vec<ComponentKey> {
        let mut state = self.lock();

        let mut keys: Vec<ComponentKey> = state
            .active
            .keys()
            .filter(|key| key.belongs_to(module))
            .cloned()
            .collect();
        keys.sort();
        for key in &keys {
            state.release(key);
        }

        if state
            .singleton_binding
            .as_ref()
            .is_some_and(|key| key.belongs_to(module))
            && let Some(key) = state.singleton_binding.take()
        {
            keys.push(key);
        }

        if !keys.is_empty() {
            info!(module_id = %module, evicted = keys.len(), "Evicted module slot bindings");
        }
        keys
    }

    /// Every pooled binding, sorted by key.
    #[must_use]
    pub fn bindings(&self) -> Vec<(ComponentKey, SlotHandle)> {
        let mut bindings: Vec<_> = self
            .lock()
            .active
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    /// Names of the currently available pooled slots, front first.
    #[must_use]
    pub fn available_slots(&self) -> Vec<String> {
        self.lock()
            .available
            .iter()
            .map(|slot| slot.name().to_owned())
            .collect()
    }

    /// Pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            capacity: state.roster.len(),
            available: state.available.len(),
            active: state.active.len(),
            singleton_configured: state.singleton.is_some(),
            singleton_bound: state.singleton_binding.is_some(),
        }
    }
}
