//! Catalog change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use modlink_core::{ModuleId, ModuleInfo};

/// Metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Correlation ID for tracing related events (e.g. one install batch).
    pub correlation_id: Option<Uuid>,
    /// Source component that generated the event.
    pub source: String,
}

impl EventMetadata {
    /// Create new event metadata.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id: None,
            source: source.into(),
        }
    }

    /// Set correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Change notifications emitted by the module catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModuleEvent {
    /// A module was installed, or an installed module was updated in place.
    Installed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The installed module record.
        module: ModuleInfo,
    },
    /// A module was uninstalled.
    Removed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The removed module.
        module_id: ModuleId,
    },
    /// A module's enabled flag changed.
    EnabledChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// The module whose flag changed.
        module_id: ModuleId,
        /// The new value of the flag.
        enabled: bool,
    },
}

impl ModuleEvent {
    /// Get the event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::Installed { metadata, .. }
            | Self::Removed { metadata, .. }
            | Self::EnabledChanged { metadata, .. } => metadata,
        }
    }

    /// The module the event is about.
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        match self {
            Self::Installed { module, .. } => &module.id,
            Self::Removed { module_id, .. } | Self::EnabledChanged { module_id, .. } => module_id,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Installed { .. } => "module_installed",
            Self::Removed { .. } => "module_removed",
            Self::EnabledChanged { .. } => "module_enabled_changed",
        }
    }
}
