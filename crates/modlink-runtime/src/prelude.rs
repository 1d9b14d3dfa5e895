//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modlink_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Lifecycle
pub use crate::{LoadOutcome, LoadReport, ModuleRuntime};

// Catalog
pub use crate::{InMemoryCatalog, ModuleCatalog};

// Failures
pub use crate::{DisableCulprit, FailurePolicy, ModuleFailure};

// Slots
pub use crate::{HostSlot, SlotAddress};

// Overlays
pub use crate::{OverlayDescriptor, OverlayHost, OverlayProvider};
