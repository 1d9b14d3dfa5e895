//! Test harness helpers.

use std::sync::Arc;

use modlink_core::ModuleId;
use modlink_events::ModuleEventBus;
use modlink_resolver::StaticCodeProvider;
use modlink_runtime::{
    DisableCulprit, FailurePolicy, InMemoryCatalog, InMemoryOverlayHost, ModuleRuntime,
    OverlayProvider,
};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use crate::fixtures::ModuleFixture;
use crate::mocks::{CallLog, VersionedOverlayProvider};

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging with default filter (warn level).
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

/// Create a temporary file with the given content.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_file(content: &str) -> NamedTempFile {
    use std::io::Write;

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// A runtime wired to in-memory catalog, code and overlays.
///
/// Slots default to a singleton `main` and the pool `S1`, `S2`; overlays
/// come from a [`VersionedOverlayProvider`].
#[derive(Debug)]
pub struct RuntimeHarness {
    /// The runtime under test.
    pub runtime: Arc<ModuleRuntime>,
    /// The catalog; mutations publish on `catalog.bus()`.
    pub catalog: Arc<InMemoryCatalog>,
    /// Code behind every installed module.
    pub code: Arc<StaticCodeProvider>,
    /// Overlays currently installed.
    pub overlays: Arc<InMemoryOverlayHost>,
    /// Callbacks of every recording entry and component.
    pub log: CallLog,
}

impl RuntimeHarness {
    /// Harness with the default slots and overlays.
    #[must_use]
    pub fn new() -> Self {
        Self::with_slots(Some("main"), &["S1", "S2"])
    }

    /// Harness with the given slots and default overlays.
    #[must_use]
    pub fn with_slots(singleton: Option<&str>, pool: &[&str]) -> Self {
        Self::build(
            singleton,
            pool,
            Arc::new(VersionedOverlayProvider::new()),
            Arc::new(DisableCulprit),
        )
    }

    /// Harness with default slots and a custom overlay provider.
    #[must_use]
    pub fn with_overlay_provider(provider: Arc<dyn OverlayProvider>) -> Self {
        Self::build(Some("main"), &["S1", "S2"], provider, Arc::new(DisableCulprit))
    }

    /// Harness with default slots and overlays and a custom failure policy.
    #[must_use]
    pub fn with_failure_policy(policy: Arc<dyn FailurePolicy>) -> Self {
        Self::build(
            Some("main"),
            &["S1", "S2"],
            Arc::new(VersionedOverlayProvider::new()),
            policy,
        )
    }

    fn build(
        singleton: Option<&str>,
        pool: &[&str],
        provider: Arc<dyn OverlayProvider>,
        policy: Arc<dyn FailurePolicy>,
    ) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new(ModuleEventBus::new()));
        let code = Arc::new(StaticCodeProvider::new());
        let overlays = Arc::new(InMemoryOverlayHost::new());

        let runtime = ModuleRuntime::new(catalog.clone(), code.clone())
            .with_overlays(provider, overlays.clone())
            .with_failure_policy(policy);
        if let Some(name) = singleton {
            runtime.pool().configure_singleton(name);
        }
        runtime
            .pool()
            .configure_pool(pool.iter().copied())
            .expect("valid test slot roster");

        Self {
            runtime: Arc::new(runtime),
            catalog,
            code,
            overlays,
            log: CallLog::new(),
        }
    }

    /// Install `fixture`'s code, then its catalog record.
    pub fn install(&self, fixture: &ModuleFixture) -> ModuleId {
        self.install_code(fixture);
        self.catalog.install(fixture.info());
        fixture.id()
    }

    /// Install `fixture`'s code only, leaving the catalog untouched.
    pub fn install_code(&self, fixture: &ModuleFixture) {
        self.code
            .insert(fixture.id(), Arc::new(fixture.build_code(&self.log)));
    }

    /// Locations of the installed overlays, oldest first.
    #[must_use]
    pub fn overlay_locations(&self) -> Vec<String> {
        self.overlays
            .active()
            .into_iter()
            .map(|o| o.location)
            .collect()
    }
}

impl Default for RuntimeHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_install_and_load() {
        let harness = RuntimeHarness::new();
        let id = harness.install(&ModuleFixture::new("alpha").with_entry());
        harness.runtime.load_module(&id).unwrap();

        assert_eq!(harness.log.take(), vec!["load:alpha@1.0.0"]);
        assert_eq!(harness.overlay_locations(), vec!["alpha@1.0.0"]);
    }

    #[test]
    fn test_file_content() {
        let file = test_file("[slots]\npool = [\"S1\"]\n");
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("S1"));
    }
}
