//! Module code: the set of types one module exports, and how it is opened.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use modlink_core::{ModuleId, ModuleInfo};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::types::TypeDef;

/// The loaded code of one module.
///
/// Implementations only ever search their own module's code.
pub trait ModuleCode: Send + Sync {
    /// Look up a type defined by this module.
    fn find_type(&self, symbol: &str) -> Option<Arc<TypeDef>>;

    /// Every symbol this module defines, sorted.
    fn symbols(&self) -> Vec<String>;
}

/// Opens a module's code from wherever it is installed.
pub trait CodeProvider: Send + Sync {
    /// Open the code for `module`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LoadFailed`] if the code cannot be opened.
    fn open(&self, module: &ModuleInfo) -> ResolveResult<Arc<dyn ModuleCode>>;
}

/// Module code assembled in memory from [`TypeDef`]s.
#[derive(Debug, Default)]
pub struct StaticModuleCode {
    types: BTreeMap<String, Arc<TypeDef>>,
}

impl StaticModuleCode {
    /// Empty module code.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type. A later type with the same symbol replaces the earlier one.
    #[must_use]
    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.insert(def.symbol().to_owned(), Arc::new(def));
        self
    }

    /// Number of types defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ModuleCode for StaticModuleCode {
    fn find_type(&self, symbol: &str) -> Option<Arc<TypeDef>> {
        self.types.get(symbol).cloned()
    }

    fn symbols(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

/// A [`CodeProvider`] backed by an in-memory table.
///
/// Installing new code for an ID that already has some replaces it; the next
/// `open` returns the new code.
#[derive(Default)]
pub struct StaticCodeProvider {
    code: RwLock<HashMap<ModuleId, Arc<dyn ModuleCode>>>,
}

impl StaticCodeProvider {
    /// Empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the code for `id`.
    pub fn insert(&self, id: ModuleId, code: Arc<dyn ModuleCode>) {
        debug!(module_id = %id, "Installing module code");
        self.code
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, code);
    }

    /// Drop the code for `id`.
    pub fn remove(&self, id: &ModuleId) -> bool {
        self.code
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(id)
            .is_some()
    }
}

impl CodeProvider for StaticCodeProvider {
    fn open(&self, module: &ModuleInfo) -> ResolveResult<Arc<dyn ModuleCode>> {
        self.code
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&module.id)
            .cloned()
            .ok_or_else(|| ResolveError::LoadFailed {
                module: module.id.clone(),
                message: "no code installed".to_owned(),
            })
    }
}

impl std::fmt::Debug for StaticCodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .code
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len();
        f.debug_struct("StaticCodeProvider")
            .field("modules", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_code_symbols_sorted() {
        let code = StaticModuleCode::new()
            .with_type(TypeDef::abstract_type("b.B"))
            .with_type(TypeDef::abstract_type("a.A"));
        assert_eq!(code.symbols(), vec!["a.A", "b.B"]);
        assert_eq!(code.len(), 2);
        assert!(code.find_type("a.A").is_some());
        assert!(code.find_type("c.C").is_none());
    }

    #[test]
    fn test_provider_open_and_replace() {
        let provider = StaticCodeProvider::new();
        let id = ModuleId::from_static("home");
        let info = ModuleInfo::new(id.clone(), "1.0.0");

        assert!(matches!(
            provider.open(&info),
            Err(ResolveError::LoadFailed { .. })
        ));

        provider.insert(
            id.clone(),
            Arc::new(StaticModuleCode::new().with_type(TypeDef::abstract_type("v1.A"))),
        );
        assert_eq!(provider.open(&info).unwrap().symbols(), vec!["v1.A"]);

        provider.insert(
            id.clone(),
            Arc::new(StaticModuleCode::new().with_type(TypeDef::abstract_type("v2.A"))),
        );
        assert_eq!(provider.open(&info).unwrap().symbols(), vec!["v2.A"]);

        assert!(provider.remove(&id));
        assert!(provider.open(&info).is_err());
    }
}
