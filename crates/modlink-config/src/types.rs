//! Configuration struct definitions.
//!
//! Every section derives `Default` and is `#[serde(default)]`, so a config
//! file only needs to mention the keys it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host-declared slots.
    pub slots: SlotsSection,
    /// Symbol resolution behavior.
    pub resolver: ResolverSection,
    /// Catalog event bus.
    pub events: EventsSection,
    /// Log output.
    pub logging: LogSection,
}

// ---------------------------------------------------------------------------
// SlotsSection
// ---------------------------------------------------------------------------

/// The fixed set of slots declared by the host manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotsSection {
    /// Name of the singleton slot, if the host declares one.
    pub singleton: Option<String>,
    /// Names of the pooled slots, in the order they are first handed out.
    pub pool: Vec<String>,
}

// ---------------------------------------------------------------------------
// ResolverSection
// ---------------------------------------------------------------------------

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    /// Record requester -> provider edges on cross-module resolution.
    pub record_dependencies: bool,
    /// How many snapshots a lookup may try when it races a module
    /// replacement.
    pub max_resolve_attempts: u32,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            record_dependencies: true,
            max_resolve_attempts: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// EventsSection
// ---------------------------------------------------------------------------

/// Catalog event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    /// Broadcast channel capacity.
    pub capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

// ---------------------------------------------------------------------------
// LogSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["modlink_slots=debug"]`).
    pub directives: Vec<String>,
    /// Write daily-rotated log files here instead of stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}
