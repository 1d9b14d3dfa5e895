//! The installed-module catalog, as seen by the runtime.

use std::sync::RwLock;

use modlink_core::{ModuleId, ModuleInfo};
use modlink_events::{EventMetadata, ModuleEvent, ModuleEventBus};
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Event source name used by [`InMemoryCatalog`].
const CATALOG_SOURCE: &str = "catalog";

/// The module catalog as the runtime sees it.
///
/// The runtime reads snapshots; changes reach it through the
/// [`ModuleEventBus`]. The one write it makes is disabling a module that
/// failed.
pub trait ModuleCatalog: Send + Sync {
    /// Every installed module, in installation order.
    fn list_installed_modules(&self) -> Vec<ModuleInfo>;

    /// The record for `id`, if installed.
    fn module(&self, id: &ModuleId) -> Option<ModuleInfo> {
        self.list_installed_modules()
            .into_iter()
            .find(|info| &info.id == id)
    }

    /// Disable `id`. Returns whether its flag changed.
    ///
    /// Catalogs that cannot be written keep this default and change nothing.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnknownModule`] if `id` is not installed.
    fn disable_module(&self, id: &ModuleId) -> RuntimeResult<bool> {
        if self.module(id).is_some() {
            Ok(false)
        } else {
            Err(RuntimeError::UnknownModule(id.clone()))
        }
    }
}

/// Catalog kept in memory that publishes a [`ModuleEvent`] for every change.
#[derive(Debug)]
pub struct InMemoryCatalog {
    modules: RwLock<Vec<ModuleInfo>>,
    bus: ModuleEventBus,
}

impl InMemoryCatalog {
    /// Create an empty catalog publishing on `bus`.
    #[must_use]
    pub fn new(bus: ModuleEventBus) -> Self {
        Self {
            modules: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// The bus this catalog publishes on.
    #[must_use]
    pub fn bus(&self) -> &ModuleEventBus {
        &self.bus
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ModuleInfo>> {
        self.modules.read().unwrap_or_else(|e| {
            warn!("Catalog lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ModuleInfo>> {
        self.modules.write().unwrap_or_else(|e| {
            warn!("Catalog lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Install `info`, or update the record in place if the module is
    /// already installed. Publishes [`ModuleEvent::Installed`].
    ///
    /// Returns `true` if this replaced an existing record.
    pub fn install(&self, info: ModuleInfo) -> bool {
        let updated = {
            let mut modules = self.write();
            if let Some(existing) = modules.iter_mut().find(|m| m.id == info.id) {
                *existing = info.clone();
                true
            } else {
                modules.push(info.clone());
                false
            }
        };
        debug!(module_id = %info.id, version = %info.version, updated, "Catalog install");
        self.bus.publish(ModuleEvent::Installed {
            metadata: EventMetadata::new(CATALOG_SOURCE),
            module: info,
        });
        updated
    }

    /// Uninstall `id`. Publishes [`ModuleEvent::Removed`] if it was installed.
    pub fn remove(&self, id: &ModuleId) -> Option<ModuleInfo> {
        let removed = {
            let mut modules = self.write();
            let index = modules.iter().position(|m| &m.id == id)?;
            modules.remove(index)
        };
        debug!(module_id = %id, "Catalog remove");
        self.bus.publish(ModuleEvent::Removed {
            metadata: EventMetadata::new(CATALOG_SOURCE),
            module_id: id.clone(),
        });
        Some(removed)
    }

    /// Flip the enabled flag of `id`. Publishes
    /// [`ModuleEvent::EnabledChanged`] only when the flag actually changes.
    ///
    /// Returns whether the flag changed.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnknownModule`] if `id` is not installed.
    pub fn set_enabled(&self, id: &ModuleId, enabled: bool) -> RuntimeResult<bool> {
        let changed = {
            let mut modules = self.write();
            let record = modules
                .iter_mut()
                .find(|m| &m.id == id)
                .ok_or_else(|| RuntimeError::UnknownModule(id.clone()))?;
            let changed = record.enabled != enabled;
            record.enabled = enabled;
            changed
        };
        if changed {
            debug!(module_id = %id, enabled, "Catalog enabled flag changed");
            self.bus.publish(ModuleEvent::EnabledChanged {
                metadata: EventMetadata::new(CATALOG_SOURCE),
                module_id: id.clone(),
                enabled,
            });
        }
        Ok(changed)
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new(ModuleEventBus::new())
    }
}

impl ModuleCatalog for InMemoryCatalog {
    fn list_installed_modules(&self) -> Vec<ModuleInfo> {
        self.read().clone()
    }

    fn module(&self, id: &ModuleId) -> Option<ModuleInfo> {
        self.read().iter().find(|m| &m.id == id).cloned()
    }

    fn disable_module(&self, id: &ModuleId) -> RuntimeResult<bool> {
        self.set_enabled(id, false)
    }
}
