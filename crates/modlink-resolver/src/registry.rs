//! The resolver registry: module ID -> loader, plus cross-module lookup.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use modlink_core::{Capability, ModuleId};
use tracing::{debug, info, warn};

use crate::code::ModuleCode;
use crate::deps::DependencyGraph;
use crate::error::{ResolveError, ResolveResult};
use crate::instance::Instance;
use crate::loader::ModuleLoader;
use crate::snapshot::RegistrySnapshot;
use crate::types::TypeHandle;

/// Registry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Record requester -> provider edges on cross-module resolution.
    pub record_dependencies: bool,
    /// How many snapshots one lookup may try while racing writers.
    pub max_resolve_attempts: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            record_dependencies: true,
            max_resolve_attempts: 3,
        }
    }
}

/// What [`ResolverRegistry::register`] did.
#[derive(Debug)]
pub enum Registration {
    /// The module had no loader before.
    Inserted(Arc<ModuleLoader>),
    /// The module's previous loader was swapped out and retired.
    Replaced {
        /// The new, live loader.
        loader: Arc<ModuleLoader>,
        /// The old loader, now retired.
        retired: Arc<ModuleLoader>,
    },
}

impl Registration {
    /// The live loader.
    #[must_use]
    pub fn loader(&self) -> &Arc<ModuleLoader> {
        match self {
            Self::Inserted(loader) | Self::Replaced { loader, .. } => loader,
        }
    }

    /// Whether an older loader was replaced.
    #[must_use]
    pub fn is_replacement(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// Registry of module loaders.
///
/// Readers never lock: they load the current [`RegistrySnapshot`] and work
/// against it. Writers are serialized by one mutex, build a new snapshot,
/// publish it, and only then retire the loader they displaced. A reader
/// therefore never sees a registry in which a replaced module is missing,
/// and a reader that picked up a handle from a now-retired loader notices
/// (the handle is unusable) and retries against the newer snapshot.
pub struct ResolverRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    writer: Mutex<()>,
    deps: DependencyGraph,
    options: ResolverOptions,
}

impl ResolverRegistry {
    /// Create an empty registry with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ResolverOptions::default())
    }

    /// Create an empty registry.
    #[must_use]
    pub fn with_options(options: ResolverOptions) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            writer: Mutex::new(()),
            deps: DependencyGraph::new(),
            options,
        }
    }

    /// The registry's options.
    #[must_use]
    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    fn write_lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|e| {
            warn!("Resolver writer lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Register a loader for `id` over `code`.
    ///
    /// If `id` already has a loader it is replaced in place (keeping its
    /// position in the search order) and retired after the new snapshot is
    /// published. Its outgoing dependency edges are dropped; the new code
    /// records its own as it resolves.
    pub fn register(&self, id: ModuleId, code: Arc<dyn ModuleCode>) -> Registration {
        let _guard = self.write_lock();
        let current = self.snapshot.load_full();
        let loader = Arc::new(ModuleLoader::new(id.clone(), code));

        let mut loaders: Vec<Arc<ModuleLoader>> = current.loaders().to_vec();
        let retired = match loaders.iter().position(|l| l.id() == &id) {
            Some(pos) => Some(std::mem::replace(&mut loaders[pos], Arc::clone(&loader))),
            None => {
                loaders.push(Arc::clone(&loader));
                None
            },
        };

        self.snapshot.store(Arc::new(RegistrySnapshot::new(loaders)));

        match retired {
            Some(old) => {
                old.retire();
                self.deps.clear_outgoing(&id);
                info!(module_id = %id, "Replaced module loader");
                Registration::Replaced {
                    loader,
                    retired: old,
                }
            },
            None => {
                info!(module_id = %id, "Registered module loader");
                Registration::Inserted(loader)
            },
        }
    }

    /// Remove `id`'s loader, retire it, and clear its dependency edges.
    ///
    /// Returns the retired loader, or `None` if `id` was not registered.
    pub fn remove(&self, id: &ModuleId) -> Option<Arc<ModuleLoader>> {
        let _guard = self.write_lock();
        let current = self.snapshot.load_full();
        let removed = current.loader(id).cloned()?;

        let loaders: Vec<Arc<ModuleLoader>> = current
            .loaders()
            .iter()
            .filter(|l| l.id() != id)
            .cloned()
            .collect();
        self.snapshot.store(Arc::new(RegistrySnapshot::new(loaders)));

        removed.retire();
        self.deps.clear(id);
        info!(module_id = %id, "Removed module loader");
        Some(removed)
    }

    /// Whether `id` has a live loader.
    #[must_use]
    pub fn is_loaded(&self, id: &ModuleId) -> bool {
        self.snapshot.load().loader(id).is_some()
    }

    /// The live loader for `id`.
    #[must_use]
    pub fn loader(&self, id: &ModuleId) -> Option<Arc<ModuleLoader>> {
        self.snapshot.load().loader(id).cloned()
    }

    /// Loaded module IDs in registration (search) order.
    #[must_use]
    pub fn loaded_modules(&self) -> Vec<ModuleId> {
        self.snapshot.load().module_ids()
    }

    /// Resolve `symbol` on behalf of `requester`: its own code first, then
    /// every other loaded module in registration order.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::ModuleNotLoaded`] if `requester` has no loader
    /// - [`ResolveError::NotFound`] if no module defines `symbol`
    /// - [`ResolveError::Retired`] if writers kept retiring the loaders this
    ///   lookup found for more than `max_resolve_attempts` snapshots
    pub fn resolve(&self, requester: &ModuleId, symbol: &str) -> ResolveResult<TypeHandle> {
        let handle = self.with_retry(symbol, |snapshot| {
            let loader = snapshot
                .loader(requester)
                .ok_or_else(|| ResolveError::ModuleNotLoaded(requester.clone()))?;
            loader.resolve(symbol, snapshot)
        })?;

        if self.options.record_dependencies && handle.owner() != requester {
            self.deps.record(requester, handle.owner());
        }
        debug!(
            module_id = %requester,
            symbol,
            provider = %handle.owner(),
            "Resolved symbol"
        );
        Ok(handle)
    }

    /// Resolve `symbol` for `requester` and build an instance of it.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::resolve`] or [`TypeHandle::instantiate`].
    pub fn instantiate(
        &self,
        requester: &ModuleId,
        symbol: &str,
        expected: &Capability,
    ) -> ResolveResult<Instance> {
        self.resolve(requester, symbol)?.instantiate(expected)
    }

    /// Find `symbol` through the symbol index, without naming a module.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::UnknownSymbol`] if no loaded module exports it
    /// - [`ResolveError::Retired`] as for [`Self::resolve`]
    pub fn locate(&self, symbol: &str) -> ResolveResult<TypeHandle> {
        self.with_retry(symbol, |snapshot| {
            let owner = snapshot
                .owner_of(symbol)
                .ok_or_else(|| ResolveError::UnknownSymbol(symbol.to_owned()))?;
            let loader = snapshot
                .loader(owner)
                .ok_or_else(|| ResolveError::ModuleNotLoaded(owner.clone()))?;
            loader.resolve_local(symbol)
        })
    }

    /// Locate `symbol` through the symbol index and build an instance of it.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::locate`] or [`TypeHandle::instantiate`].
    pub fn instantiate_anywhere(
        &self,
        symbol: &str,
        expected: &Capability,
    ) -> ResolveResult<Instance> {
        self.locate(symbol)?.instantiate(expected)
    }

    /// Run `lookup` against successive snapshots until it yields a usable
    /// handle, fails against a snapshot that is still current, or runs out
    /// of attempts.
    fn with_retry<F>(&self, symbol: &str, lookup: F) -> ResolveResult<TypeHandle>
    where
        F: Fn(&RegistrySnapshot) -> ResolveResult<TypeHandle>,
    {
        let attempts = self.options.max_resolve_attempts.max(1);
        let mut outcome = None;

        for attempt in 1..=attempts {
            let snapshot = self.snapshot.load_full();
            let result = lookup(&snapshot);
            let still_current = Arc::ptr_eq(&snapshot, &self.snapshot.load());

            match result {
                Ok(handle) if handle.is_usable() => return Ok(handle),
                Ok(handle) => {
                    outcome = Some(ResolveError::Retired {
                        symbol: symbol.to_owned(),
                        module: handle.owner().clone(),
                    });
                },
                Err(e) if still_current => return Err(e),
                Err(e) => outcome = Some(e),
            }
            debug!(symbol, attempt, "Registry changed during lookup, retrying");
        }

        warn!(symbol, attempts, "Lookup kept racing registry writers");
        Err(outcome.unwrap_or_else(|| ResolveError::UnknownSymbol(symbol.to_owned())))
    }

    /// Everything `id` needs, transitively, excluding `id`.
    #[must_use]
    pub fn dependencies_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.deps.dependencies_of(id)
    }

    /// Everything that needs `id`, transitively, excluding `id`.
    #[must_use]
    pub fn dependents_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.deps.dependents_of(id)
    }

    /// Everything that needs `id`, transitively, with providers ahead of
    /// the modules that need them.
    #[must_use]
    pub fn dependents_in_load_order(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.deps.dependents_in_load_order(id)
    }

    /// The learned dependency graph.
    #[must_use]
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.deps
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("modules", &self.loaded_modules())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
