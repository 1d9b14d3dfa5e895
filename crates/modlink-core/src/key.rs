//! Logical component keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::id::ModuleId;

/// Key identifying one logical, module-hosted component.
///
/// A key is the owning module, the fully-qualified class name of the
/// component, and an optional instance tag. The tag lets the same class run
/// as several independent components (e.g. one download worker per task).
///
/// The textual form is `{module}/{class}` or `{module}/{class}:{instance}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentKey {
    module: ModuleId,
    class_name: String,
    instance: Option<String>,
}

impl ComponentKey {
    /// Key for the default instance of `class_name` in `module`.
    #[must_use]
    pub fn new(module: ModuleId, class_name: impl Into<String>) -> Self {
        Self {
            module,
            class_name: class_name.into(),
            instance: None,
        }
    }

    /// Attach an instance tag.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// The owning module.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// The fully-qualified component class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The instance tag, if any.
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Whether this key belongs to `module`.
    #[must_use]
    pub fn belongs_to(&self, module: &ModuleId) -> bool {
        &self.module == module
    }

    /// Whether this key is an instance (tagged or not) of `class_name` in `module`.
    #[must_use]
    pub fn is_instance_of(&self, module: &ModuleId, class_name: &str) -> bool {
        self.belongs_to(module) && self.class_name == class_name
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.module, self.class_name)?;
        if let Some(instance) = &self.instance {
            write!(f, ":{instance}")?;
        }
        Ok(())
    }
}

impl FromStr for ComponentKey {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let (module, rest) = s
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidKey(format!("missing '/' separator: {s}")))?;
        let module = ModuleId::new(module)?;
        let (class_name, instance) = match rest.split_once(':') {
            Some((class_name, instance)) => (class_name, Some(instance)),
            None => (rest, None),
        };
        if class_name.is_empty() {
            return Err(CoreError::InvalidKey(format!("empty class name: {s}")));
        }
        let key = Self::new(module, class_name);
        match instance {
            Some("") => Err(CoreError::InvalidKey(format!("empty instance tag: {s}"))),
            Some(tag) => Ok(key.with_instance(tag)),
            None => Ok(key),
        }
    }
}
