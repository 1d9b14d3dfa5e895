//! Module lifecycle: loading, unloading, replacement and chain relaunch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use modlink_config::Config;
use modlink_core::{Capability, ComponentKey, ModuleId, ModuleInfo};
use modlink_events::{EventReceiver, ModuleEvent};
use modlink_resolver::{
    CodeProvider, Instance, ModuleContext, ModuleEntry, ResolveError, ResolverOptions,
    ResolverRegistry,
};
use modlink_slots::{SlotHandle, SlotPool};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::address::SlotAddress;
use crate::catalog::ModuleCatalog;
use crate::config_bridge;
use crate::error::{RuntimeError, RuntimeResult};
use crate::failure::{DisableCulprit, FailureAction, FailurePolicy, ModuleFailure};
use crate::overlay::{
    InMemoryOverlayHost, NoOverlays, OverlayAdapter, OverlayDescriptor, OverlayHost,
    OverlayProvider,
};

/// Entry instances of loaded modules. The mutex around it also serializes
/// lifecycle transitions.
type Entries = HashMap<ModuleId, Box<dyn ModuleEntry>>;

/// What [`ModuleRuntime::load_module`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The module was not loaded before.
    Loaded,
    /// A loaded module was replaced with freshly opened code.
    Replaced,
}

/// Result of [`ModuleRuntime::load_enabled_modules`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Modules loaded by this call, in catalog order.
    pub loaded: Vec<ModuleId>,
    /// Modules that failed to load, in catalog order.
    pub failed: Vec<ModuleId>,
}

/// Owns the resolver registry, the slot pool and the overlay adapter, and
/// drives them from catalog state.
///
/// Share it behind an [`Arc`]; the event pump and [`HostSlot`]s hold
/// clones.
///
/// [`HostSlot`]: crate::HostSlot
pub struct ModuleRuntime {
    registry: ResolverRegistry,
    pool: SlotPool,
    catalog: Arc<dyn ModuleCatalog>,
    code: Arc<dyn CodeProvider>,
    overlays: OverlayAdapter,
    failures: Arc<dyn FailurePolicy>,
    lifecycle: Mutex<Entries>,
}

impl ModuleRuntime {
    /// Create a runtime with default resolver options, no slots and no
    /// overlays.
    #[must_use]
    pub fn new(catalog: Arc<dyn ModuleCatalog>, code: Arc<dyn CodeProvider>) -> Self {
        Self {
            registry: ResolverRegistry::new(),
            pool: SlotPool::new(),
            catalog,
            code,
            overlays: OverlayAdapter::new(
                Arc::new(NoOverlays),
                Arc::new(InMemoryOverlayHost::new()),
            ),
            failures: Arc::new(DisableCulprit),
            lifecycle: Mutex::new(HashMap::new()),
        }
    }

    /// Create a runtime configured from `config`: resolver options and the
    /// slot roster.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Config`] if `config` fails validation, or
    /// [`RuntimeError::Slot`] if the pool rejects the slot names.
    pub fn from_config(
        config: &Config,
        catalog: Arc<dyn ModuleCatalog>,
        code: Arc<dyn CodeProvider>,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        let runtime = Self::new(catalog, code)
            .with_resolver_options(config_bridge::to_resolver_options(config));
        config_bridge::configure_slots(config, &runtime.pool)?;
        Ok(runtime)
    }

    /// Use `provider` and `host` for module resource overlays.
    #[must_use]
    pub fn with_overlays(
        mut self,
        provider: Arc<dyn OverlayProvider>,
        host: Arc<dyn OverlayHost>,
    ) -> Self {
        self.overlays = OverlayAdapter::new(provider, host);
        self
    }

    /// Use `policy` to decide what happens to modules whose components fail.
    /// Defaults to [`DisableCulprit`].
    #[must_use]
    pub fn with_failure_policy(mut self, policy: Arc<dyn FailurePolicy>) -> Self {
        self.failures = policy;
        self
    }

    /// Replace the resolver options. Call before loading any module.
    #[must_use]
    pub fn with_resolver_options(mut self, options: ResolverOptions) -> Self {
        self.registry = ResolverRegistry::with_options(options);
        self
    }

    /// The resolver registry.
    #[must_use]
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// The slot pool.
    #[must_use]
    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// The catalog this runtime reads.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn ModuleCatalog> {
        &self.catalog
    }

    /// Whether `id` is loaded.
    #[must_use]
    pub fn is_loaded(&self, id: &ModuleId) -> bool {
        self.registry.is_loaded(id)
    }

    /// Loaded modules in search order.
    #[must_use]
    pub fn loaded_modules(&self) -> Vec<ModuleId> {
        self.registry.loaded_modules()
    }

    /// The overlay currently installed for `id`.
    #[must_use]
    pub fn overlay_of(&self, id: &ModuleId) -> Option<OverlayDescriptor> {
        self.overlays.current(id)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Entries> {
        self.lifecycle.lock().unwrap_or_else(|e| {
            warn!("Module lifecycle lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// The catalog record for `id`, if it exists and is enabled.
    fn enabled_info(&self, id: &ModuleId) -> RuntimeResult<ModuleInfo> {
        let info = self
            .catalog
            .module(id)
            .ok_or_else(|| RuntimeError::UnknownModule(id.clone()))?;
        if info.enabled {
            Ok(info)
        } else {
            Err(RuntimeError::ModuleDisabled(id.clone()))
        }
    }

    // ----------------------------------------------------------------------
    // Lifecycle
    // ----------------------------------------------------------------------

    /// Load `id` from the catalog, or replace it if already loaded.
    ///
    /// Opens the module's code, registers its loader, adds its overlay and,
    /// if it declares an entry symbol, instantiates the entry and calls
    /// `on_load`. If the entry cannot be started the load is rolled back.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::UnknownModule`] / [`RuntimeError::ModuleDisabled`]
    /// - [`RuntimeError::Resolve`] if the code cannot be opened or the entry
    ///   symbol cannot be instantiated
    pub fn load_module(&self, id: &ModuleId) -> RuntimeResult<LoadOutcome> {
        let mut entries = self.lock_lifecycle();
        let info = self.enabled_info(id)?;
        self.load_locked(&mut entries, &info)
    }

    /// Unload `id`: stop its entry, evict its slot bindings, remove its
    /// overlay, retire its loader and forget its dependency edges.
    ///
    /// Returns `false` if it was not loaded.
    pub fn unload_module(&self, id: &ModuleId) -> bool {
        let mut entries = self.lock_lifecycle();
        self.unload_locked(&mut entries, id)
    }

    /// Load every enabled catalog module that is not loaded yet.
    ///
    /// Failures are logged and reported, never fatal to the batch.
    pub fn load_enabled_modules(&self) -> LoadReport {
        let mut entries = self.lock_lifecycle();
        let mut report = LoadReport::default();

        for info in self.catalog.list_installed_modules() {
            if !info.enabled || self.registry.is_loaded(&info.id) {
                continue;
            }
            match self.load_locked(&mut entries, &info) {
                Ok(_) => report.loaded.push(info.id),
                Err(e) => {
                    warn!(module_id = %info.id, error = %e, "Failed to load module");
                    report.failed.push(info.id);
                },
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Loaded enabled modules"
        );
        report
    }

    /// Restart `id` together with everything that transitively depends on
    /// it.
    ///
    /// A module is never stopped before something that needs it, nor
    /// started before something it needs: dependents are unloaded first,
    /// then `id`, and loading runs in the opposite order. Returns the reloaded modules in load
    /// order.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::UnknownModule`] / [`RuntimeError::ModuleDisabled`]
    ///   for `id` itself, checked before anything is unloaded
    /// - [`RuntimeError::RelaunchFailed`] naming every module that could not
    ///   be loaded again; the others stay loaded
    pub fn relaunch_module(&self, id: &ModuleId) -> RuntimeResult<Vec<ModuleId>> {
        let mut entries = self.lock_lifecycle();
        self.enabled_info(id)?;

        let dependents = self.registry.dependents_in_load_order(id);
        info!(module_id = %id, dependents = dependents.len(), "Relaunching module chain");

        for dependent in dependents.iter().rev() {
            self.unload_locked(&mut entries, dependent);
        }
        self.unload_locked(&mut entries, id);

        let mut restarted = Vec::with_capacity(dependents.len().saturating_add(1));
        let mut failed = Vec::new();
        for module in std::iter::once(id).chain(dependents.iter()) {
            let result = self
                .enabled_info(module)
                .and_then(|info| self.load_locked(&mut entries, &info));
            match result {
                Ok(_) => restarted.push(module.clone()),
                Err(e) => {
                    warn!(module_id = %module, error = %e, "Module did not come back after relaunch");
                    failed.push(module.clone());
                },
            }
        }

        if failed.is_empty() {
            Ok(restarted)
        } else {
            Err(RuntimeError::RelaunchFailed {
                module: id.clone(),
                failed,
            })
        }
    }

    fn load_locked(&self, entries: &mut Entries, info: &ModuleInfo) -> RuntimeResult<LoadOutcome> {
        let code = self.code.open(info)?;

        if self.registry.is_loaded(&info.id) {
            Self::stop_entry(entries, &info.id);
            self.pool.evict_module(&info.id);
        }
        let registration = self.registry.register(info.id.clone(), code);
        self.overlays.attach(info);

        if let Some(symbol) = &info.entry_symbol
            && let Err(e) = self.start_entry(entries, info, symbol)
        {
            self.overlays.detach(&info.id);
            self.registry.remove(&info.id);
            warn!(module_id = %info.id, symbol = %symbol, error = %e, "Module entry failed, load rolled back");
            return Err(e);
        }

        let outcome = if registration.is_replacement() {
            LoadOutcome::Replaced
        } else {
            LoadOutcome::Loaded
        };
        info!(module_id = %info.id, version = %info.version, ?outcome, "Module loaded");
        Ok(outcome)
    }

    fn unload_locked(&self, entries: &mut Entries, id: &ModuleId) -> bool {
        if !self.registry.is_loaded(id) {
            return false;
        }
        Self::stop_entry(entries, id);
        let evicted = self.pool.evict_module(id);
        self.overlays.detach(id);
        self.registry.remove(id);
        info!(module_id = %id, evicted = evicted.len(), "Module unloaded");
        true
    }

    fn start_entry(&self, entries: &mut Entries, info: &ModuleInfo, symbol: &str) -> RuntimeResult<()> {
        let mut entry = self
            .registry
            .instantiate(&info.id, symbol, &Capability::Entry)?
            .into_entry()
            .ok_or_else(|| RuntimeError::InvalidEntry {
                module: info.id.clone(),
                symbol: symbol.to_owned(),
            })?;
        entry.on_load(&ModuleContext {
            module_id: info.id.clone(),
            version: info.version.clone(),
        });
        debug!(module_id = %info.id, symbol, "Module entry started");
        entries.insert(info.id.clone(), entry);
        Ok(())
    }

    fn stop_entry(entries: &mut Entries, id: &ModuleId) {
        if let Some(mut entry) = entries.remove(id) {
            entry.on_unload();
            debug!(module_id = %id, "Module entry stopped");
        }
    }

    // ----------------------------------------------------------------------
    // Catalog events
    // ----------------------------------------------------------------------

    /// Apply one catalog notification.
    ///
    /// # Errors
    ///
    /// Any error from loading the module the event is about.
    pub fn handle_event(&self, event: &ModuleEvent) -> RuntimeResult<()> {
        debug!(
            module_id = %event.module_id(),
            event_type = event.event_type(),
            "Handling module event"
        );
        match event {
            ModuleEvent::Installed { module, .. } if module.enabled => {
                let mut entries = self.lock_lifecycle();
                self.load_locked(&mut entries, module).map(drop)
            },
            ModuleEvent::Installed { module, .. } => {
                self.unload_module(&module.id);
                Ok(())
            },
            ModuleEvent::EnabledChanged {
                module_id,
                enabled: true,
                ..
            } => self.load_module(module_id).map(drop),
            ModuleEvent::Removed { module_id, .. }
            | ModuleEvent::EnabledChanged {
                module_id,
                enabled: false,
                ..
            } => {
                self.unload_module(module_id);
                Ok(())
            },
        }
    }

    /// Spawn a task applying every event from `receiver` until the bus
    /// closes. Failures are logged and the pump keeps going.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_event_pump(self: &Arc<Self>, mut receiver: EventReceiver) -> JoinHandle<()> {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = runtime.handle_event(&event) {
                    warn!(
                        module_id = %event.module_id(),
                        event_type = event.event_type(),
                        error = %e,
                        "Failed to apply module event"
                    );
                }
            }
            debug!("Module event bus closed, pump stopped");
        })
    }

    // ----------------------------------------------------------------------
    // Caller API
    // ----------------------------------------------------------------------

    /// Load `id` on first use.
    fn ensure_loaded(&self, id: &ModuleId) -> RuntimeResult<()> {
        if self.registry.is_loaded(id) {
            return Ok(());
        }
        let mut entries = self.lock_lifecycle();
        self.ensure_loaded_locked(&mut entries, id)
    }

    fn ensure_loaded_locked(&self, entries: &mut Entries, id: &ModuleId) -> RuntimeResult<()> {
        if self.registry.is_loaded(id) {
            return Ok(());
        }
        let info = self.enabled_info(id)?;
        self.load_locked(entries, &info).map(drop)
    }

    /// Instantiate `class_name` as seen from `module`, loading the module
    /// first if needed.
    ///
    /// A resolver failure that can be pinned on a module goes to the
    /// failure policy before it is returned.
    ///
    /// # Errors
    ///
    /// Catalog errors for `module`, or any resolver error.
    pub fn request_component(
        &self,
        module: &ModuleId,
        class_name: &str,
        capability: &Capability,
    ) -> RuntimeResult<Instance> {
        self.ensure_loaded(module)?;
        self.registry
            .instantiate(module, class_name, capability)
            .map_err(|e| {
                self.report_failure(module, &e);
                e.into()
            })
    }

    fn report_failure(&self, requester: &ModuleId, error: &ResolveError) {
        let Some(failure) = ModuleFailure::from_resolve_error(requester, error) else {
            return;
        };
        let action = self.failures.on_failure(&failure);
        warn!(
            module_id = %failure.culprit,
            kind = %failure.kind,
            symbol = %failure.symbol,
            ?action,
            "Module failure"
        );
        if action == FailureAction::Disable {
            match self.catalog.disable_module(&failure.culprit) {
                Ok(true) => info!(module_id = %failure.culprit, "Module disabled after failure"),
                Ok(false) => {},
                Err(e) => {
                    warn!(module_id = %failure.culprit, error = %e, "Could not disable failed module");
                },
            }
        }
    }

    /// Bind `key` to a pooled slot and return its address.
    ///
    /// # Errors
    ///
    /// Catalog errors for the key's module, or
    /// [`SlotError::Exhausted`](modlink_slots::SlotError::Exhausted).
    pub fn acquire_slot_for(&self, key: &ComponentKey) -> RuntimeResult<SlotAddress> {
        // Held across the bind so an unload cannot slip in between.
        let mut entries = self.lock_lifecycle();
        self.ensure_loaded_locked(&mut entries, key.module())?;
        let slot = self.pool.acquire(key)?;
        drop(entries);
        debug!(key = %key, slot = %slot, "Slot address issued");
        Ok(SlotAddress::new(slot, key.clone()))
    }

    /// Release whatever slot `key` holds, pooled or singleton.
    pub fn release_slot_for(&self, key: &ComponentKey) -> Option<SlotHandle> {
        if let Some(slot) = self.pool.release(key) {
            return Some(slot);
        }
        if self.pool.release_singleton(key) {
            return self.pool.singleton().ok();
        }
        None
    }

    /// The current address of `key`, if it holds a slot.
    #[must_use]
    pub fn address_of(&self, key: &ComponentKey) -> Option<SlotAddress> {
        if let Some(slot) = self.pool.lookup(key) {
            return Some(SlotAddress::new(slot, key.clone()));
        }
        if self.pool.singleton_binding().as_ref() == Some(key) {
            return self
                .pool
                .singleton()
                .ok()
                .map(|slot| SlotAddress::new(slot, key.clone()));
        }
        None
    }

    /// Bind `key` to the singleton slot and return its address. A key bound
    /// there before is displaced.
    ///
    /// # Errors
    ///
    /// Catalog errors for the key's module, or
    /// [`SlotError::Unconfigured`](modlink_slots::SlotError::Unconfigured).
    pub fn singleton_address(&self, key: &ComponentKey) -> RuntimeResult<SlotAddress> {
        let mut entries = self.lock_lifecycle();
        self.ensure_loaded_locked(&mut entries, key.module())?;
        let (slot, displaced) = self.pool.bind_singleton(key)?;
        drop(entries);
        if let Some(old) = displaced {
            debug!(key = %key, displaced = %old, "Singleton address reissued");
        }
        Ok(SlotAddress::new(slot, key.clone()))
    }

    /// Every running instance of `class_name` in `module`, sorted.
    #[must_use]
    pub fn running_instances_for(&self, module: &ModuleId, class_name: &str) -> Vec<ComponentKey> {
        self.pool.running_instances_for(module, class_name)
    }
}

impl std::fmt::Debug for ModuleRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRuntime")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("overlays", &self.overlays)
            .finish_non_exhaustive()
    }
}
