//! Test fixtures for common types and module code.

use modlink_core::{ComponentKey, ModuleId, ModuleInfo};
use modlink_resolver::{StaticModuleCode, TypeDef};

use crate::mocks::{CallLog, RecordingComponent, RecordingEntry};

/// Create a test module ID.
///
/// # Panics
///
/// Panics if `name` is not a valid module ID.
#[must_use]
pub fn test_module_id(name: &str) -> ModuleId {
    ModuleId::new(name).expect("valid test module id")
}

/// Create an enabled module record.
#[must_use]
pub fn test_module_info(name: &str, version: &str) -> ModuleInfo {
    ModuleInfo::new(test_module_id(name), version)
}

/// Create a component key without an instance tag.
#[must_use]
pub fn test_component_key(module: &str, class_name: &str) -> ComponentKey {
    ComponentKey::new(test_module_id(module), class_name)
}

/// Describes the code of one test module.
///
/// Objects built from an `object` symbol carry the string
/// `<symbol>@<module>`, so a test can tell which module served it.
#[derive(Debug, Clone)]
pub struct ModuleFixture {
    name: String,
    version: String,
    entry: bool,
    enabled: bool,
    components: Vec<String>,
    objects: Vec<(String, Vec<String>)>,
    abstracts: Vec<String>,
}

impl ModuleFixture {
    /// An enabled module at version `1.0.0` with no code.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_owned(),
            entry: false,
            enabled: true,
            components: Vec::new(),
            objects: Vec::new(),
            abstracts: Vec::new(),
        }
    }

    /// Set the version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Give the module a recording entry point at `<name>.Main`.
    #[must_use]
    pub fn with_entry(mut self) -> Self {
        self.entry = true;
        self
    }

    /// Mark the module disabled in the catalog.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Export a recording component.
    #[must_use]
    pub fn component(mut self, symbol: impl Into<String>) -> Self {
        self.components.push(symbol.into());
        self
    }

    /// Export an object implementing `contracts`.
    #[must_use]
    pub fn object(mut self, symbol: impl Into<String>, contracts: &[&str]) -> Self {
        self.objects.push((
            symbol.into(),
            contracts.iter().map(|c| (*c).to_owned()).collect(),
        ));
        self
    }

    /// Export a type with no zero-argument constructor.
    #[must_use]
    pub fn abstract_type(mut self, symbol: impl Into<String>) -> Self {
        self.abstracts.push(symbol.into());
        self
    }

    /// The module ID.
    #[must_use]
    pub fn id(&self) -> ModuleId {
        test_module_id(&self.name)
    }

    /// Entry symbol, if the module has one.
    #[must_use]
    pub fn entry_symbol(&self) -> Option<String> {
        self.entry.then(|| format!("{}.Main", self.name))
    }

    /// The catalog record.
    #[must_use]
    pub fn info(&self) -> ModuleInfo {
        let info = ModuleInfo::new(self.id(), self.version.clone()).with_enabled(self.enabled);
        match self.entry_symbol() {
            Some(symbol) => info.with_entry(symbol),
            None => info,
        }
    }

    /// Build the module's code, recording callbacks into `log`.
    #[must_use]
    pub fn build_code(&self, log: &CallLog) -> StaticModuleCode {
        let mut code = StaticModuleCode::new();

        if let Some(symbol) = self.entry_symbol() {
            let log = log.clone();
            let name = self.name.clone();
            code = code.with_type(TypeDef::entry(symbol, move || {
                RecordingEntry::new(name.clone(), log.clone())
            }));
        }
        for symbol in &self.components {
            let log = log.clone();
            let tag = symbol.clone();
            code = code.with_type(TypeDef::component(symbol.clone(), move || {
                RecordingComponent::new(tag.clone(), log.clone())
            }));
        }
        for (symbol, contracts) in &self.objects {
            let value = format!("{symbol}@{}", self.name);
            let contracts: Vec<&str> = contracts.iter().map(String::as_str).collect();
            code = code.with_type(TypeDef::object(symbol.clone(), &contracts, move || {
                value.clone()
            }));
        }
        for symbol in &self.abstracts {
            code = code.with_type(TypeDef::abstract_type(symbol.clone()));
        }
        code
    }
}
