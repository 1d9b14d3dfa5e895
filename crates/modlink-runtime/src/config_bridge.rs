//! Bridge from `modlink_config::Config` to runtime types.
//!
//! The config crate has no dependencies on the other modlink crates; this
//! module turns its sections into the resolver options, slot roster and
//! event bus the runtime uses.

use modlink_config::Config;
use modlink_events::ModuleEventBus;
use modlink_resolver::ResolverOptions;
use modlink_slots::{SlotPool, SlotResult};
use tracing::debug;

/// Convert the `[resolver]` section to [`ResolverOptions`].
#[must_use]
pub fn to_resolver_options(cfg: &Config) -> ResolverOptions {
    ResolverOptions {
        record_dependencies: cfg.resolver.record_dependencies,
        max_resolve_attempts: cfg.resolver.max_resolve_attempts,
    }
}

/// Apply the `[slots]` section to `pool`.
///
/// # Errors
///
/// Returns [`SlotError::DuplicateSlot`](modlink_slots::SlotError::DuplicateSlot)
/// if the pooled names repeat.
pub fn configure_slots(cfg: &Config, pool: &SlotPool) -> SlotResult<()> {
    if let Some(name) = &cfg.slots.singleton {
        pool.configure_singleton(name.clone());
    }
    pool.configure_pool(cfg.slots.pool.iter().cloned())?;
    debug!(
        singleton = cfg.slots.singleton.as_deref().unwrap_or("-"),
        pooled = cfg.slots.pool.len(),
        "Slots configured"
    );
    Ok(())
}

/// Build the catalog event bus with the `[events]` capacity.
#[must_use]
pub fn to_event_bus(cfg: &Config) -> ModuleEventBus {
    ModuleEventBus::with_capacity(cfg.events.capacity)
}
