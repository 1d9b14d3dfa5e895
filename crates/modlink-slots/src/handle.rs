//! Slot handles.

use std::fmt;
use std::sync::Arc;

/// Flavor of a host-declared slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// The one system-wide slot.
    Singleton,
    /// One of N interchangeable slots.
    Pooled,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("singleton"),
            Self::Pooled => f.write_str("pooled"),
        }
    }
}

/// Identifies one host-declared slot. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    name: Arc<str>,
    kind: SlotKind,
}

impl SlotHandle {
    /// Handle for the singleton slot called `name`.
    #[must_use]
    pub fn singleton(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Singleton,
        }
    }

    /// Handle for the pooled slot called `name`.
    #[must_use]
    pub fn pooled(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Pooled,
        }
    }

    /// The slot's host-declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The slot's flavor.
    #[must_use]
    pub fn kind(&self) -> SlotKind {
        self.kind
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
