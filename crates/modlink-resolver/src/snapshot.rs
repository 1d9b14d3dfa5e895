//! Immutable registry snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use modlink_core::ModuleId;

use crate::loader::{ModuleLoader, PeerFinder};
use crate::types::TypeHandle;

/// One published state of the registry.
///
/// Snapshots are never mutated; writers build a new one and swap it in.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    /// Loaders in registration order.
    loaders: Vec<Arc<ModuleLoader>>,
    /// Symbol -> first module (in registration order) that exports it.
    index: HashMap<String, ModuleId>,
}

impl RegistrySnapshot {
    /// Build a snapshot over `loaders`, indexing their exports.
    pub(crate) fn new(loaders: Vec<Arc<ModuleLoader>>) -> Self {
        let mut index = HashMap::new();
        for loader in &loaders {
            for symbol in loader.exports() {
                index.entry(symbol).or_insert_with(|| loader.id().clone());
            }
        }
        Self { loaders, index }
    }

    /// The loader for `id`, if registered.
    #[must_use]
    pub fn loader(&self, id: &ModuleId) -> Option<&Arc<ModuleLoader>> {
        self.loaders.iter().find(|l| l.id() == id)
    }

    /// Registered loaders in registration order.
    #[must_use]
    pub fn loaders(&self) -> &[Arc<ModuleLoader>] {
        &self.loaders
    }

    /// Registered module IDs in registration order.
    #[must_use]
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.loaders.iter().map(|l| l.id().clone()).collect()
    }

    /// The module the symbol index attributes `symbol` to.
    #[must_use]
    pub fn owner_of(&self, symbol: &str) -> Option<&ModuleId> {
        self.index.get(symbol)
    }

    /// Number of registered loaders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no loaders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl PeerFinder for RegistrySnapshot {
    fn find_in_peers(&self, requester: &ModuleId, symbol: &str) -> Option<TypeHandle> {
        self.loaders
            .iter()
            .filter(|loader| loader.id() != requester)
            .find_map(|loader| loader.resolve_local(symbol).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::StaticModuleCode;
    use crate::types::TypeDef;

    fn loader(id: &str, symbols: &[&str]) -> Arc<ModuleLoader> {
        let code = symbols.iter().fold(StaticModuleCode::new(), |code, s| {
            code.with_type(TypeDef::abstract_type(*s))
        });
        Arc::new(ModuleLoader::new(ModuleId::from_static(id), Arc::new(code)))
    }

    #[test]
    fn test_index_first_registration_wins() {
        let snapshot = RegistrySnapshot::new(vec![
            loader("b", &["shared.Type", "b.Only"]),
            loader("a", &["shared.Type"]),
        ]);
        assert_eq!(snapshot.owner_of("shared.Type").unwrap().as_str(), "b");
        assert_eq!(snapshot.owner_of("b.Only").unwrap().as_str(), "b");
        assert!(snapshot.owner_of("missing").is_none());
    }

    #[test]
    fn test_peer_search_skips_requester() {
        let snapshot = RegistrySnapshot::new(vec![
            loader("a", &["x.X"]),
            loader("b", &["x.X"]),
        ]);
        let handle = snapshot
            .find_in_peers(&ModuleId::from_static("a"), "x.X")
            .unwrap();
        assert_eq!(handle.owner().as_str(), "b");
        assert!(
            snapshot
                .find_in_peers(&ModuleId::from_static("a"), "y.Y")
                .is_none()
        );
    }

    #[test]
    fn test_module_ids_in_registration_order() {
        let snapshot = RegistrySnapshot::new(vec![loader("z", &[]), loader("a", &[])]);
        let ids: Vec<_> = snapshot.module_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(snapshot.len(), 2);
    }
}
