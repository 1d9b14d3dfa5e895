//! What happens to a module whose code fails at runtime.
//!
//! When a component request fails, the runtime works out which module is
//! to blame and asks a [`FailurePolicy`] what to do with it. The default
//! policy, [`DisableCulprit`], disables modules with missing dependencies
//! through the catalog and leaves update mismatches alone.

use std::fmt;

use modlink_core::ModuleId;
use modlink_resolver::ResolveError;

/// Broad class of a module failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The module needs a symbol no loaded module provides.
    MissingDependency,
    /// The module and the code it talks to disagree, usually because one
    /// side was updated: a capability mismatch or a retired type.
    IncompatibleUpdate,
    /// The module's own type could not be built.
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingDependency => "missing dependency",
            Self::IncompatibleUpdate => "incompatible update",
            Self::Other => "module error",
        })
    }
}

/// A failure pinned on one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    /// The module held responsible.
    pub culprit: ModuleId,
    /// What kind of failure this is.
    pub kind: FailureKind,
    /// The symbol involved.
    pub symbol: String,
    /// The underlying error, rendered.
    pub message: String,
}

impl ModuleFailure {
    /// Attribute `error`, raised while `requester` asked for a symbol.
    ///
    /// Returns `None` for errors that say nothing about module code, such as
    /// a module that is not loaded or could not be opened.
    #[must_use]
    pub fn from_resolve_error(requester: &ModuleId, error: &ResolveError) -> Option<Self> {
        let (culprit, kind, symbol) = match error {
            ResolveError::NotFound {
                symbol,
                requester: culprit,
            } => (culprit, FailureKind::MissingDependency, symbol),
            ResolveError::AttachFailed { symbol, .. } => {
                (requester, FailureKind::IncompatibleUpdate, symbol)
            },
            ResolveError::Retired { symbol, module } => {
                (module, FailureKind::IncompatibleUpdate, symbol)
            },
            ResolveError::NotConstructible { symbol, .. } => (requester, FailureKind::Other, symbol),
            ResolveError::UnknownSymbol(_)
            | ResolveError::ModuleNotLoaded(_)
            | ResolveError::LoadFailed { .. } => return None,
        };
        Some(Self {
            culprit: culprit.clone(),
            kind,
            symbol: symbol.clone(),
            message: error.to_string(),
        })
    }
}

/// What to do with the culprit of a [`ModuleFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Disable the module in the catalog.
    Disable,
    /// Leave the module as it is; the error still reaches the caller.
    Keep,
}

/// Decides the fate of a module that failed.
pub trait FailurePolicy: Send + Sync {
    /// Called once per attributed failure, before the error is returned.
    fn on_failure(&self, failure: &ModuleFailure) -> FailureAction;
}

/// Disable modules with missing dependencies or broken types; keep modules
/// that only hit an update mismatch, since reloading the other side fixes
/// those.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisableCulprit;

impl FailurePolicy for DisableCulprit {
    fn on_failure(&self, failure: &ModuleFailure) -> FailureAction {
        match failure.kind {
            FailureKind::MissingDependency | FailureKind::Other => FailureAction::Disable,
            FailureKind::IncompatibleUpdate => FailureAction::Keep,
        }
    }
}

/// Never disable anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepModules;

impl FailurePolicy for KeepModules {
    fn on_failure(&self, _failure: &ModuleFailure) -> FailureAction {
        FailureAction::Keep
    }
}
