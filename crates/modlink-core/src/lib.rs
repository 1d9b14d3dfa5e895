//! Modlink Core - Identity types for the modlink dynamic-module runtime.
//!
//! This crate provides:
//! - [`ModuleId`]: stable, validated identifier of an installed module
//! - [`ModuleInfo`]: the read-only catalog record of an installed module
//! - [`ComponentKey`]: the logical key a long-running component is addressed by
//! - [`Capability`]: the contract an instance must satisfy at its use site
//!
//! It has no dependencies on other internal modlink crates.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod capability;
pub mod error;
pub mod id;
pub mod key;
pub mod module;

pub use capability::Capability;
pub use error::{CoreError, CoreResult};
pub use id::ModuleId;
pub use key::ComponentKey;
pub use module::ModuleInfo;
