//! Resolver error types.

use modlink_core::{Capability, ModuleId};
use thiserror::Error;

/// Errors raised while resolving or instantiating symbols.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The symbol is defined neither in the requesting module nor in any
    /// other loaded module. Terminal; never retried.
    #[error("symbol not found: {symbol} (requested by module {requester})")]
    NotFound {
        /// The missing symbol.
        symbol: String,
        /// The module whose lookup failed.
        requester: ModuleId,
    },

    /// No loaded module exports the symbol.
    #[error("no loaded module exports symbol: {0}")]
    UnknownSymbol(String),

    /// The type exists but cannot be built with zero arguments.
    #[error("symbol {symbol} is not constructible: {reason}")]
    NotConstructible {
        /// The type's symbol.
        symbol: String,
        /// Why construction failed.
        reason: String,
    },

    /// The constructed instance does not satisfy the expected capability.
    #[error("symbol {symbol} does not satisfy {expected} (instance is {actual})")]
    AttachFailed {
        /// The type's symbol.
        symbol: String,
        /// The capability the caller required.
        expected: Capability,
        /// What the instance actually is.
        actual: String,
    },

    /// The module has no loader in the registry.
    #[error("module not loaded: {0}")]
    ModuleNotLoaded(ModuleId),

    /// The handle's loader was retired (module unloaded or replaced).
    #[error("type {symbol} from module {module} belongs to a retired loader")]
    Retired {
        /// The type's symbol.
        symbol: String,
        /// The module that produced the type.
        module: ModuleId,
    },

    /// A module's code could not be opened.
    #[error("failed to load module {module}: {message}")]
    LoadFailed {
        /// The module that failed to load.
        module: ModuleId,
        /// What went wrong.
        message: String,
    },
}

/// Result type for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
