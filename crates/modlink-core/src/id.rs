//! Module identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Unique, stable identifier of an installed module.
///
/// Module IDs are package-style strings like `"com.example.home"` or
/// `"media-player"`. They must be non-empty and contain only lowercase ASCII
/// letters, digits, `.`, `_` and `-`, and must not start or end with `.` or
/// `-`. An ID never changes for the lifetime of the module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleId(String);

/// Deserialize with validation, so a crafted catalog file cannot smuggle in
/// an ID that would be rejected by [`ModuleId::new`].
impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl ModuleId {
    /// Create a new `ModuleId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidId`] if the ID is empty or contains
    /// invalid characters.
    pub fn new(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a `ModuleId` without validation (for tests and internal use).
    #[must_use]
    pub fn from_static(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid module ID without constructing one.
    #[must_use]
    pub fn is_valid_id(id: &str) -> bool {
        Self::validate(id).is_ok()
    }

    fn validate(id: &str) -> CoreResult<()> {
        if id.is_empty() {
            return Err(CoreError::InvalidId("module id must not be empty".into()));
        }
        if !id.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
        }) {
            return Err(CoreError::InvalidId(format!(
                "module id must contain only lowercase alphanumeric characters, '.', '_' and '-', got: {id}"
            )));
        }
        if id.starts_with(['.', '-']) || id.ends_with(['.', '-']) {
            return Err(CoreError::InvalidId(format!(
                "module id must not start or end with '.' or '-', got: {id}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
