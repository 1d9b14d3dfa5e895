//! Recording mocks for module entries, components and overlays.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use modlink_core::{ModuleId, ModuleInfo};
use modlink_resolver::{ComponentContext, HostSignal, HostedComponent, ModuleContext, ModuleEntry};
use modlink_runtime::{
    FailureAction, FailurePolicy, ModuleFailure, OverlayDescriptor, OverlayError, OverlayProvider,
};

/// Ordered, shared record of lifecycle callbacks.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append a line.
    pub fn push(&self, line: impl Into<String>) {
        self.lock().push(line.into());
    }

    /// Every line so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Every line so far, clearing the log.
    #[must_use]
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Whether any line equals `line`.
    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.lock().iter().any(|l| l == line)
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Module entry that logs `load:<module>@<version>` and `unload:<module>`.
#[derive(Debug)]
pub struct RecordingEntry {
    module: String,
    log: CallLog,
}

impl RecordingEntry {
    /// Entry for `module` writing to `log`.
    #[must_use]
    pub fn new(module: impl Into<String>, log: CallLog) -> Self {
        Self {
            module: module.into(),
            log,
        }
    }
}

impl ModuleEntry for RecordingEntry {
    fn on_load(&mut self, ctx: &ModuleContext) {
        self.log
            .push(format!("load:{}@{}", ctx.module_id, ctx.version));
    }

    fn on_unload(&mut self) {
        self.log.push(format!("unload:{}", self.module));
    }
}

/// Hosted component that logs every callback as `<callback>:<symbol>[:detail]`.
#[derive(Debug)]
pub struct RecordingComponent {
    symbol: String,
    log: CallLog,
}

impl RecordingComponent {
    /// Component for `symbol` writing to `log`.
    #[must_use]
    pub fn new(symbol: impl Into<String>, log: CallLog) -> Self {
        Self {
            symbol: symbol.into(),
            log,
        }
    }
}

impl HostedComponent for RecordingComponent {
    fn on_attach(&mut self, ctx: &ComponentContext) {
        self.log
            .push(format!("attach:{}:{}", self.symbol, ctx.slot));
    }

    fn on_create(&mut self) {
        self.log.push(format!("create:{}", self.symbol));
    }

    fn on_start(&mut self, start_id: u64) {
        self.log.push(format!("start:{}:{start_id}", self.symbol));
    }

    fn on_state_changed(&mut self, signal: HostSignal) {
        self.log
            .push(format!("signal:{}:{signal:?}", self.symbol));
    }

    fn on_destroy(&mut self) {
        self.log.push(format!("destroy:{}", self.symbol));
    }
}

/// Overlay provider serving `<module>@<version>` for every module, except
/// the ones configured to fail or to have no overlay.
#[derive(Debug, Default)]
pub struct VersionedOverlayProvider {
    failing: HashSet<ModuleId>,
    without: HashSet<ModuleId>,
}

impl VersionedOverlayProvider {
    /// Provider with an overlay for every module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` fail.
    #[must_use]
    pub fn failing_for(mut self, id: ModuleId) -> Self {
        self.failing.insert(id);
        self
    }

    /// Give `id` no overlay.
    #[must_use]
    pub fn none_for(mut self, id: ModuleId) -> Self {
        self.without.insert(id);
        self
    }
}

impl OverlayProvider for VersionedOverlayProvider {
    fn overlay_for(&self, module: &ModuleInfo) -> Result<Option<OverlayDescriptor>, OverlayError> {
        if self.failing.contains(&module.id) {
            return Err(OverlayError(format!("no resources for {}", module.id)));
        }
        if self.without.contains(&module.id) {
            return Ok(None);
        }
        Ok(Some(OverlayDescriptor::new(
            module,
            format!("{}@{}", module.id, module.version),
        )))
    }
}

/// Failure policy that records every failure and answers with a fixed
/// action.
#[derive(Debug)]
pub struct RecordingFailurePolicy {
    action: FailureAction,
    seen: Mutex<Vec<ModuleFailure>>,
}

impl RecordingFailurePolicy {
    /// Policy answering `action` to every failure.
    #[must_use]
    pub fn new(action: FailureAction) -> Self {
        Self {
            action,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Failures reported so far.
    #[must_use]
    pub fn failures(&self) -> Vec<ModuleFailure> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl FailurePolicy for RecordingFailurePolicy {
    fn on_failure(&self, failure: &ModuleFailure) -> FailureAction {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(failure.clone());
        self.action
    }
}
