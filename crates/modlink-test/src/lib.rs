//! modlink test - shared test utilities for the modlink runtime.
//!
//! This crate provides fixtures, recording mocks and a runtime harness that
//! can be used across modlink crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! modlink-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use modlink_test::prelude::*;
//!
//! #[test]
//! fn test_load() {
//!     let harness = RuntimeHarness::new();
//!     let id = harness.install(&ModuleFixture::new("alpha").with_entry());
//!     harness.runtime.load_module(&id).unwrap();
//!     assert_eq!(harness.log.take(), vec!["load:alpha@1.0.0"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
