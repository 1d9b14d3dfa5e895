//! Per-module loaders.

use std::fmt;
use std::sync::Arc;

use modlink_core::{Capability, ModuleId};
use tracing::trace;

use crate::code::ModuleCode;
use crate::error::{ResolveError, ResolveResult};
use crate::instance::Instance;
use crate::types::{Liveness, TypeHandle};

/// Searches the loaders of modules other than the requester.
///
/// Implementations must only call [`ModuleLoader::resolve_local`] on peers,
/// never [`ModuleLoader::resolve`]. That is what keeps a lookup from
/// bouncing between two modules that each lack the symbol.
pub trait PeerFinder {
    /// Find `symbol` in any loaded module except `requester`.
    fn find_in_peers(&self, requester: &ModuleId, symbol: &str) -> Option<TypeHandle>;
}

/// Owns the loaded code of one module.
pub struct ModuleLoader {
    id: ModuleId,
    code: Arc<dyn ModuleCode>,
    liveness: Liveness,
}

impl ModuleLoader {
    /// Create a live loader for `id` over `code`.
    #[must_use]
    pub fn new(id: ModuleId, code: Arc<dyn ModuleCode>) -> Self {
        Self {
            id,
            code,
            liveness: Liveness::new(),
        }
    }

    /// The module this loader serves.
    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Symbols defined by this module, sorted.
    #[must_use]
    pub fn exports(&self) -> Vec<String> {
        self.code.symbols()
    }

    /// Whether this loader has been retired.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        !self.liveness.is_alive()
    }

    /// Retire the loader. Every handle it produced becomes unusable.
    pub(crate) fn retire(&self) {
        self.liveness.retire();
    }

    /// Resolve `symbol` in this module's own code only. Never delegates.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::ModuleNotLoaded`] if the loader is retired
    /// - [`ResolveError::NotFound`] if this module does not define `symbol`
    pub fn resolve_local(&self, symbol: &str) -> ResolveResult<TypeHandle> {
        if self.is_retired() {
            return Err(ResolveError::ModuleNotLoaded(self.id.clone()));
        }
        self.code
            .find_type(symbol)
            .map(|def| TypeHandle::new(def, self.id.clone(), self.liveness.clone()))
            .ok_or_else(|| ResolveError::NotFound {
                symbol: symbol.to_owned(),
                requester: self.id.clone(),
            })
    }

    /// Resolve `symbol` locally, then in peer modules via `peers`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::ModuleNotLoaded`] if the loader is retired
    /// - [`ResolveError::NotFound`] if neither this module nor any peer
    ///   defines `symbol`
    pub fn resolve(&self, symbol: &str, peers: &dyn PeerFinder) -> ResolveResult<TypeHandle> {
        match self.resolve_local(symbol) {
            Err(ResolveError::NotFound { .. }) => {
                trace!(module_id = %self.id, symbol, "Not local, searching peers");
                peers
                    .find_in_peers(&self.id, symbol)
                    .ok_or_else(|| ResolveError::NotFound {
                        symbol: symbol.to_owned(),
                        requester: self.id.clone(),
                    })
            },
            other => other,
        }
    }

    /// Resolve `symbol` and build a zero-argument instance of it.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::resolve`] or [`TypeHandle::instantiate`].
    pub fn instantiate(
        &self,
        symbol: &str,
        expected: &Capability,
        peers: &dyn PeerFinder,
    ) -> ResolveResult<Instance> {
        self.resolve(symbol, peers)?.instantiate(expected)
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("id", &self.id)
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}
