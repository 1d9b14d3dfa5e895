//! Capability contracts checked at the resolution boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The contract an instance must satisfy at its use site.
///
/// An instance is checked against its expected capability exactly once,
/// right after construction. From then on it is handled as the concrete
/// variant the capability names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Capability {
    /// Module entry point, notified when its module loads and unloads.
    Entry,
    /// Long-running component hosted by a slot.
    Component,
    /// Any other named contract (an interface the caller and module agree on).
    Contract(String),
}

impl Capability {
    /// Shorthand for [`Capability::Contract`].
    #[must_use]
    pub fn contract(name: impl Into<String>) -> Self {
        Self::Contract(name.into())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => f.write_str("entry"),
            Self::Component => f.write_str("component"),
            Self::Contract(name) => write!(f, "contract:{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::Entry.to_string(), "entry");
        assert_eq!(Capability::Component.to_string(), "component");
        assert_eq!(
            Capability::contract("com.example.Greeter").to_string(),
            "contract:com.example.Greeter"
        );
    }

    #[test]
    fn test_capability_serde() {
        let json = serde_json::to_string(&Capability::contract("x.Y")).unwrap();
        assert_eq!(json, r#"{"kind":"contract","name":"x.Y"}"#);
        let parsed: Capability = serde_json::from_str(r#"{"kind":"component"}"#).unwrap();
        assert_eq!(parsed, Capability::Component);
    }
}
