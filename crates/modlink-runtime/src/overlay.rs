//! Resource overlays contributed by loaded modules.
//!
//! A module may ship resources the host should see while the module is
//! loaded. The [`OverlayProvider`] says what a module contributes; the
//! [`OverlayHost`] installs and removes it. The runtime keeps the two in step
//! with module load, unload and replacement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use modlink_core::{ModuleId, ModuleInfo};
use thiserror::Error;
use tracing::{debug, warn};

/// An overlay operation failed. Never fatal to module loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct OverlayError(pub String);

/// Resources one module contributes to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDescriptor {
    /// The contributing module.
    pub module_id: ModuleId,
    /// Where the host finds the resources (path or URI, host-defined).
    pub location: String,
    /// Module version the resources belong to.
    pub version: String,
}

impl OverlayDescriptor {
    /// Describe an overlay for `info` at `location`.
    #[must_use]
    pub fn new(info: &ModuleInfo, location: impl Into<String>) -> Self {
        Self {
            module_id: info.id.clone(),
            location: location.into(),
            version: info.version.clone(),
        }
    }
}

/// Says which overlay, if any, a module contributes.
pub trait OverlayProvider: Send + Sync {
    /// The overlay for `module`, or `None` if it has nothing to add.
    ///
    /// # Errors
    ///
    /// Any provider failure. The runtime logs it and loads the module
    /// without an overlay.
    fn overlay_for(&self, module: &ModuleInfo) -> Result<Option<OverlayDescriptor>, OverlayError>;
}

/// Installs overlays into the host's resource lookup.
pub trait OverlayHost: Send + Sync {
    /// Make `overlay` visible to the host.
    ///
    /// # Errors
    ///
    /// Any host failure.
    fn add_overlay(&self, overlay: &OverlayDescriptor) -> Result<(), OverlayError>;

    /// Withdraw a previously added overlay.
    ///
    /// # Errors
    ///
    /// Any host failure.
    fn remove_overlay(&self, overlay: &OverlayDescriptor) -> Result<(), OverlayError>;
}

/// Provider for hosts without module resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverlays;

impl OverlayProvider for NoOverlays {
    fn overlay_for(&self, _module: &ModuleInfo) -> Result<Option<OverlayDescriptor>, OverlayError> {
        Ok(None)
    }
}

/// Host that keeps its active overlays in a list, most recent last.
#[derive(Debug, Default)]
pub struct InMemoryOverlayHost {
    active: Mutex<Vec<OverlayDescriptor>>,
}

impl InMemoryOverlayHost {
    /// Empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OverlayDescriptor>> {
        self.active.lock().unwrap_or_else(|e| {
            warn!("Overlay host lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Overlays currently installed.
    #[must_use]
    pub fn active(&self) -> Vec<OverlayDescriptor> {
        self.lock().clone()
    }
}

impl OverlayHost for InMemoryOverlayHost {
    fn add_overlay(&self, overlay: &OverlayDescriptor) -> Result<(), OverlayError> {
        let mut active = self.lock();
        if !active.contains(overlay) {
            active.push(overlay.clone());
        }
        Ok(())
    }

    fn remove_overlay(&self, overlay: &OverlayDescriptor) -> Result<(), OverlayError> {
        self.lock().retain(|o| o != overlay);
        Ok(())
    }
}

/// Keeps one overlay per loaded module in sync with the host.
pub(crate) struct OverlayAdapter {
    provider: Arc<dyn OverlayProvider>,
    host: Arc<dyn OverlayHost>,
    installed: Mutex<HashMap<ModuleId, OverlayDescriptor>>,
}

impl OverlayAdapter {
    pub(crate) fn new(provider: Arc<dyn OverlayProvider>, host: Arc<dyn OverlayHost>) -> Self {
        Self {
            provider,
            host,
            installed: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ModuleId, OverlayDescriptor>> {
        self.installed.lock().unwrap_or_else(|e| {
            warn!("Overlay adapter lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Install the overlay for `info`, swapping out any overlay the module
    /// already had.
    pub(crate) fn attach(&self, info: &ModuleInfo) {
        let next = match self.provider.overlay_for(info) {
            Ok(next) => next,
            Err(e) => {
                warn!(module_id = %info.id, error = %e, "Overlay provider failed");
                None
            },
        };

        let mut installed = self.lock();
        if let Some(previous) = installed.remove(&info.id) {
            self.withdraw(&previous);
        }
        let Some(next) = next else {
            return;
        };
        match self.host.add_overlay(&next) {
            Ok(()) => {
                debug!(module_id = %info.id, location = %next.location, "Overlay added");
                installed.insert(info.id.clone(), next);
            },
            Err(e) => {
                warn!(module_id = %info.id, error = %e, "Failed to add overlay");
            },
        }
    }

    /// Remove the overlay of `id`, if it has one.
    pub(crate) fn detach(&self, id: &ModuleId) {
        let previous = self.lock().remove(id);
        if let Some(previous) = previous {
            self.withdraw(&previous);
        }
    }

    /// The overlay currently installed for `id`.
    pub(crate) fn current(&self, id: &ModuleId) -> Option<OverlayDescriptor> {
        self.lock().get(id).cloned()
    }

    fn withdraw(&self, overlay: &OverlayDescriptor) {
        match self.host.remove_overlay(overlay) {
            Ok(()) => {
                debug!(module_id = %overlay.module_id, location = %overlay.location, "Overlay removed");
            },
            Err(e) => {
                warn!(module_id = %overlay.module_id, error = %e, "Failed to remove overlay");
            },
        }
    }
}

impl std::fmt::Debug for OverlayAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayAdapter")
            .field("installed", &self.lock().len())
            .finish_non_exhaustive()
    }
}
