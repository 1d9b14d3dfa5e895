//! Modlink Telemetry - Logging setup for the modlink runtime.
//!
//! Every modlink crate logs through `tracing` with structured fields
//! (`module_id`, `key`, `slot`). This crate installs the subscriber that
//! turns those events into output: pretty, compact, full or JSON lines, to
//! stdout, stderr or a rotating file.
//!
//! # Example
//!
//! ```rust,no_run
//! use modlink_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), modlink_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("modlink_resolver=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!(module_id = "com.example.home", "Module loaded");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
