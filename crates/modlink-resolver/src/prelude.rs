//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modlink_resolver::prelude::*;` to import all essential types.

// Errors
pub use crate::{ResolveError, ResolveResult};

// Registry
pub use crate::{Registration, ResolverOptions, ResolverRegistry};

// Code and types
pub use crate::{CodeProvider, ModuleCode, StaticModuleCode, TypeDef, TypeHandle};

// Instances
pub use crate::{
    ComponentContext, ContractObject, HostSignal, HostedComponent, Instance, ModuleContext,
    ModuleEntry,
};
