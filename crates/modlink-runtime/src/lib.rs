//! modlink runtime - module lifecycle glue.
//!
//! This crate ties the catalog, the resolver registry, the slot pool and
//! resource overlays together:
//! - [`ModuleRuntime`] loads, unloads, replaces and relaunches modules,
//!   either explicitly or driven by catalog events
//! - [`HostSlot`] adapts one host slot instance to the component it hosts
//! - [`FailurePolicy`] decides what happens to a module whose components fail
//! - [`config_bridge`] turns a `modlink_config::Config` into runtime settings
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use modlink_core::{ComponentKey, ModuleId, ModuleInfo};
//! use modlink_resolver::{StaticCodeProvider, StaticModuleCode, TypeDef};
//! use modlink_runtime::{InMemoryCatalog, ModuleRuntime};
//!
//! let id = ModuleId::from_static("greeter");
//! let code = StaticCodeProvider::new();
//! code.insert(
//!     id.clone(),
//!     Arc::new(StaticModuleCode::new().with_type(TypeDef::object(
//!         "greeter.Greeting",
//!         &["Greeting"],
//!         || String::from("hello"),
//!     ))),
//! );
//! let catalog = InMemoryCatalog::default();
//! catalog.install(ModuleInfo::new(id.clone(), "1.0.0"));
//!
//! let runtime = ModuleRuntime::new(Arc::new(catalog), Arc::new(code));
//! runtime.pool().configure_pool(["S1"]).unwrap();
//!
//! let report = runtime.load_enabled_modules();
//! assert_eq!(report.loaded, vec![id.clone()]);
//!
//! let address = runtime
//!     .acquire_slot_for(&ComponentKey::new(id, "greeter.Service"))
//!     .unwrap();
//! assert_eq!(address.slot.name(), "S1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod address;
mod catalog;
mod error;
mod failure;
mod host_slot;
mod overlay;
mod runtime;

pub use address::SlotAddress;
pub use catalog::{InMemoryCatalog, ModuleCatalog};
pub use error::{RuntimeError, RuntimeResult};
pub use failure::{
    DisableCulprit, FailureAction, FailureKind, FailurePolicy, KeepModules, ModuleFailure,
};
pub use host_slot::HostSlot;
pub use overlay::{
    InMemoryOverlayHost, NoOverlays, OverlayDescriptor, OverlayError, OverlayHost, OverlayProvider,
};
pub use runtime::{LoadOutcome, LoadReport, ModuleRuntime};
