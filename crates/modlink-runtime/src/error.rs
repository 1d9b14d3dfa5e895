//! Runtime error types.

use modlink_core::{ComponentKey, ModuleId};
use modlink_resolver::ResolveError;
use modlink_slots::SlotError;
use thiserror::Error;

/// Errors that can occur in the module runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Symbol resolution or instantiation failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Slot allocation failed.
    #[error(transparent)]
    Slot(#[from] SlotError),

    /// Configuration could not be applied.
    #[error(transparent)]
    Config(#[from] modlink_config::ConfigError),

    /// The catalog has no module with this ID.
    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    /// The module is installed but disabled.
    #[error("Module is disabled: {0}")]
    ModuleDisabled(ModuleId),

    /// The module's entry symbol produced something other than an entry.
    #[error("Entry symbol {symbol} of {module} is not a module entry")]
    InvalidEntry {
        /// The module.
        module: ModuleId,
        /// The declared entry symbol.
        symbol: String,
    },

    /// A chain relaunch could not bring every module back.
    #[error("Relaunch of {module} failed for: {failed:?}")]
    RelaunchFailed {
        /// The module the relaunch was requested for.
        module: ModuleId,
        /// Modules that failed to load again.
        failed: Vec<ModuleId>,
    },

    /// A slot address was handed to a host slot it does not name.
    #[error("Address names slot {actual}, but this host slot is {expected}")]
    SlotMismatch {
        /// The host slot's name.
        expected: String,
        /// The slot named in the address.
        actual: String,
    },

    /// The key is no longer bound to the addressed slot.
    #[error("Stale slot address for {0}")]
    StaleAddress(ComponentKey),

    /// The host slot already hosts a component.
    #[error("Slot {slot} already hosts {key}")]
    SlotBusy {
        /// The host slot's name.
        slot: String,
        /// The component it currently hosts.
        key: ComponentKey,
    },

    /// The host slot has no component attached.
    #[error("Slot {0} has no attached component")]
    NotAttached(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
