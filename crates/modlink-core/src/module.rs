//! Installed module records.

use serde::{Deserialize, Serialize};

use crate::id::ModuleId;

/// Read-only catalog record of an installed module.
///
/// Produced by the installer side of the system. The runtime never mutates
/// it; it only reacts to catalog snapshots and change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module identifier.
    pub id: ModuleId,
    /// Installed version string, opaque to the runtime.
    pub version: String,
    /// Whether the module should be loaded automatically.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fully-qualified symbol of the module's entry point, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_symbol: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ModuleInfo {
    /// Create an enabled module record without an entry point.
    #[must_use]
    pub fn new(id: ModuleId, version: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
            enabled: true,
            entry_symbol: None,
        }
    }

    /// Set the entry point symbol.
    #[must_use]
    pub fn with_entry(mut self, symbol: impl Into<String>) -> Self {
        self.entry_symbol = Some(symbol.into());
        self
    }

    /// Set the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let info = ModuleInfo::new(ModuleId::from_static("home"), "1.2.0")
            .with_entry("home.Entry")
            .with_enabled(false);
        assert_eq!(info.version, "1.2.0");
        assert_eq!(info.entry_symbol.as_deref(), Some("home.Entry"));
        assert!(!info.enabled);
    }

    #[test]
    fn test_deserialize_defaults() {
        let info: ModuleInfo = serde_json::from_str(r#"{"id":"home","version":"1.0"}"#).unwrap();
        assert!(info.enabled);
        assert!(info.entry_symbol.is_none());
    }
}
