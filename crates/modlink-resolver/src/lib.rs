//! Modlink Resolver - Cross-module symbol resolution.
//!
//! Every loaded module gets a [`ModuleLoader`] over its [`ModuleCode`]. A
//! loader resolves symbols in two tiers:
//!
//! - [`ModuleLoader::resolve_local`] searches only the module's own code and
//!   never delegates;
//! - [`ModuleLoader::resolve`] tries the local tier, then asks a
//!   [`PeerFinder`] to run `resolve_local` on every *other* loader.
//!
//! Because peers are only ever asked for their local tier, two modules that
//! both lack a symbol cannot send a lookup back and forth forever.
//!
//! [`ResolverRegistry`] owns the loaders, publishes immutable
//! [`RegistrySnapshot`]s for lock-free reads, keeps a symbol index, and
//! learns a [`DependencyGraph`] from successful cross-module lookups.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use modlink_core::{Capability, ModuleId};
//! use modlink_resolver::{ResolverRegistry, StaticModuleCode, TypeDef};
//!
//! let registry = ResolverRegistry::new();
//! registry.register(ModuleId::from_static("app"), Arc::new(StaticModuleCode::new()));
//! registry.register(
//!     ModuleId::from_static("greeter"),
//!     Arc::new(StaticModuleCode::new().with_type(TypeDef::object(
//!         "greeter.English",
//!         &["greeter.Greeter"],
//!         || String::from("hello"),
//!     ))),
//! );
//!
//! let app = ModuleId::from_static("app");
//! let handle = registry.resolve(&app, "greeter.English").unwrap();
//! assert_eq!(handle.owner().as_str(), "greeter");
//!
//! let greeter = handle
//!     .instantiate(&Capability::contract("greeter.Greeter"))
//!     .unwrap()
//!     .into_object()
//!     .unwrap();
//! assert_eq!(greeter.downcast_ref::<String>().map(String::as_str), Some("hello"));
//! assert_eq!(registry.dependencies_of(&app), vec![ModuleId::from_static("greeter")]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod code;
mod deps;
mod error;
mod instance;
mod loader;
mod registry;
mod snapshot;
mod types;

pub use code::{CodeProvider, ModuleCode, StaticCodeProvider, StaticModuleCode};
pub use deps::DependencyGraph;
pub use error::{ResolveError, ResolveResult};
pub use instance::{
    ComponentContext, ContractObject, HostSignal, HostedComponent, Instance, ModuleContext,
    ModuleEntry,
};
pub use loader::{ModuleLoader, PeerFinder};
pub use registry::{Registration, ResolverOptions, ResolverRegistry};
pub use snapshot::RegistrySnapshot;
pub use types::{Constructor, Liveness, TypeDef, TypeHandle};
