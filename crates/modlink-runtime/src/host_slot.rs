//! Host-side adapter for one slot instance.

use std::sync::Arc;

use modlink_core::{Capability, ComponentKey};
use modlink_resolver::{ComponentContext, HostSignal, HostedComponent};
use modlink_slots::{SlotHandle, SlotKind};
use tracing::{debug, info, warn};

use crate::address::SlotAddress;
use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::ModuleRuntime;

struct Attached {
    key: ComponentKey,
    component: Box<dyn HostedComponent>,
    last_start_id: u64,
}

/// One running instance of a host-declared slot.
///
/// The host creates a `HostSlot` when it starts the slot and forwards its
/// lifecycle callbacks here. The slot adopts the component named by the
/// [`SlotAddress`] it is started with and relays callbacks to it.
pub struct HostSlot {
    runtime: Arc<ModuleRuntime>,
    slot: SlotHandle,
    attached: Option<Attached>,
}

impl HostSlot {
    /// Create an empty host slot for `slot`.
    #[must_use]
    pub fn new(runtime: Arc<ModuleRuntime>, slot: SlotHandle) -> Self {
        Self {
            runtime,
            slot,
            attached: None,
        }
    }

    /// The slot this host serves.
    #[must_use]
    pub fn slot(&self) -> &SlotHandle {
        &self.slot
    }

    /// Key of the hosted component, if one is attached.
    #[must_use]
    pub fn key(&self) -> Option<&ComponentKey> {
        self.attached.as_ref().map(|a| &a.key)
    }

    /// Whether a component is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Adopt the component named by `address`: instantiate it, then call its
    /// `on_attach` and `on_create`.
    ///
    /// If instantiation fails the key is released so the slot can be reused,
    /// and the runtime's [`FailurePolicy`](crate::FailurePolicy) decides
    /// whether the module stays enabled.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::SlotMismatch`] if `address` names another slot
    /// - [`RuntimeError::SlotBusy`] if a component is already attached
    /// - [`RuntimeError::StaleAddress`] if the key no longer holds this slot
    /// - any error from instantiating the component
    pub fn on_attach(&mut self, address: &SlotAddress) -> RuntimeResult<()> {
        if address.slot != self.slot {
            return Err(RuntimeError::SlotMismatch {
                expected: self.slot.name().to_owned(),
                actual: address.slot.name().to_owned(),
            });
        }
        if let Some(current) = &self.attached {
            return Err(RuntimeError::SlotBusy {
                slot: self.slot.name().to_owned(),
                key: current.key.clone(),
            });
        }
        if !self.holds(&address.key) {
            return Err(RuntimeError::StaleAddress(address.key.clone()));
        }

        let key = &address.key;
        let component = self
            .runtime
            .request_component(key.module(), key.class_name(), &Capability::Component)
            .and_then(|instance| {
                let describe = instance.describe();
                instance.into_component().ok_or_else(|| {
                    modlink_resolver::ResolveError::AttachFailed {
                        symbol: key.class_name().to_owned(),
                        expected: Capability::Component,
                        actual: describe,
                    }
                    .into()
                })
            });
        let mut component = match component {
            Ok(component) => component,
            Err(e) => {
                warn!(key = %key, slot = %self.slot, error = %e, "Slot failed to attach component");
                self.release(key);
                return Err(e);
            },
        };

        component.on_attach(&ComponentContext {
            key: key.clone(),
            slot: self.slot.name().to_owned(),
        });
        component.on_create();
        info!(key = %key, slot = %self.slot, request_id = %address.request_id, "Component attached");

        self.attached = Some(Attached {
            key: key.clone(),
            component,
            last_start_id: 0,
        });
        Ok(())
    }

    /// Deliver a start request. Returns the start id handed to the
    /// component; ids increase by one per request, starting at 1.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotAttached`] if no component is attached.
    pub fn on_start(&mut self) -> RuntimeResult<u64> {
        let attached = self.attached_mut()?;
        attached.last_start_id = attached.last_start_id.saturating_add(1);
        let start_id = attached.last_start_id;
        attached.component.on_start(start_id);
        debug!(key = %attached.key, start_id, "Start delivered");
        Ok(start_id)
    }

    /// Forward a host signal.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotAttached`] if no component is attached.
    pub fn on_state_changed(&mut self, signal: HostSignal) -> RuntimeResult<()> {
        let attached = self.attached_mut()?;
        attached.component.on_state_changed(signal);
        Ok(())
    }

    /// Shut the component down, drop it and release its key.
    ///
    /// Returns the key that was hosted, or `None` if the slot was empty.
    pub fn on_destroy(&mut self) -> Option<ComponentKey> {
        let Attached {
            key, mut component, ..
        } = self.attached.take()?;
        component.on_destroy();
        drop(component);
        self.release(&key);
        info!(key = %key, slot = %self.slot, "Component destroyed");
        Some(key)
    }

    fn attached_mut(&mut self) -> RuntimeResult<&mut Attached> {
        self.attached
            .as_mut()
            .ok_or_else(|| RuntimeError::NotAttached(self.slot.name().to_owned()))
    }

    /// Whether `key` is currently bound to this slot.
    fn holds(&self, key: &ComponentKey) -> bool {
        let pool = self.runtime.pool();
        match self.slot.kind() {
            SlotKind::Pooled => pool.lookup(key).as_ref() == Some(&self.slot),
            SlotKind::Singleton => pool.singleton_binding().as_ref() == Some(key),
        }
    }

    /// Release `key`, but only the binding that points at this slot.
    fn release(&self, key: &ComponentKey) {
        if !self.holds(key) {
            return;
        }
        let pool = self.runtime.pool();
        match self.slot.kind() {
            SlotKind::Pooled => {
                pool.release(key);
            },
            SlotKind::Singleton => {
                pool.release_singleton(key);
            },
        }
    }
}

impl std::fmt::Debug for HostSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSlot")
            .field("slot", &self.slot)
            .field("key", &self.key())
            .finish_non_exhaustive()
    }
}
