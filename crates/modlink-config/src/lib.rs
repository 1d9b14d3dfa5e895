#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the modlink runtime.
//!
//! A single [`Config`] deserialized from TOML:
//!
//! ```toml
//! [slots]
//! singleton = "host.SingletonSlot"
//! pool = ["host.Slot1", "host.Slot2", "host.Slot3"]
//!
//! [resolver]
//! record_dependencies = true
//! max_resolve_attempts = 3
//!
//! [events]
//! capacity = 256
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use modlink_config::Config;
//!
//! let config = Config::load_file(std::path::Path::new("modlink.toml")).unwrap();
//! println!("{} pooled slots", config.slots.pool.len());
//! ```
//!
//! This crate has no dependencies on other internal modlink crates.
//! Conversion into runtime types happens in `modlink-runtime`.

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration from a single TOML file.
    ///
    /// Keys missing from the file take their built-in defaults, or a
    /// `MODLINK_*` environment variable where one is mapped.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the TOML is malformed or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
