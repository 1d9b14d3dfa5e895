//! Integration tests for catalog-driven module lifecycle.
//!
//! The catalog publishes on its bus; an event pump feeds the runtime. Covers
//! load, replacement, disable/enable, removal, slot eviction and overlays.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use modlink_core::Capability;
use modlink_runtime::{FailureAction, FailureKind, LoadOutcome, ModuleRuntime, RuntimeError};
use modlink_test::{
    ModuleFixture, RecordingFailurePolicy, RuntimeHarness, VersionedOverlayProvider,
    setup_test_logging_default,
    test_component_key, test_module_id,
};

/// Poll `condition` until it holds or five seconds pass.
async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_catalog_events_drive_lifecycle() {
    setup_test_logging_default();
    let harness = RuntimeHarness::new();
    let pump = harness
        .runtime
        .spawn_event_pump(harness.catalog.bus().subscribe());
    let runtime: &Arc<ModuleRuntime> = &harness.runtime;

    let v1 = ModuleFixture::new("alpha").with_entry();
    let id = harness.install(&v1);
    wait_until("initial load", || runtime.is_loaded(&id)).await;

    let key = test_component_key("alpha", "alpha.Svc");
    runtime.acquire_slot_for(&key).unwrap();

    harness.catalog.set_enabled(&id, false).unwrap();
    wait_until("disable", || !runtime.is_loaded(&id)).await;
    assert!(runtime.address_of(&key).is_none());

    harness.catalog.set_enabled(&id, true).unwrap();
    wait_until("enable", || runtime.is_loaded(&id)).await;

    harness.install(&ModuleFixture::new("alpha").with_entry().version("2.0.0"));
    wait_until("update", || {
        harness.overlay_locations() == vec!["alpha@2.0.0".to_owned()]
    })
    .await;

    harness.catalog.remove(&id);
    wait_until("removal", || !runtime.is_loaded(&id)).await;

    assert_eq!(
        harness.log.take(),
        vec![
            "load:alpha@1.0.0",
            "unload:alpha",
            "load:alpha@1.0.0",
            "unload:alpha",
            "load:alpha@2.0.0",
            "unload:alpha",
        ]
    );
    assert!(harness.overlay_locations().is_empty());
    pump.abort();
}

#[tokio::test]
async fn test_failed_event_does_not_stop_pump() {
    let harness = RuntimeHarness::new();
    let pump = harness
        .runtime
        .spawn_event_pump(harness.catalog.bus().subscribe());

    // Catalog entry without code: the load fails and is logged.
    harness.catalog.install(ModuleFixture::new("ghost").info());
    let id = harness.install(&ModuleFixture::new("real"));

    let runtime = Arc::clone(&harness.runtime);
    wait_until("second module", || runtime.is_loaded(&id)).await;
    assert!(!runtime.is_loaded(&test_module_id("ghost")));
    pump.abort();
}

#[test]
fn test_load_enabled_modules_in_catalog_order() {
    let harness = RuntimeHarness::new();
    harness.install(&ModuleFixture::new("zeta").with_entry());
    harness.install(&ModuleFixture::new("off").with_entry().disabled());
    harness.install(&ModuleFixture::new("alpha").with_entry());

    let report = harness.runtime.load_enabled_modules();
    assert!(report.failed.is_empty());
    let loaded: Vec<_> = report.loaded.iter().map(ToString::to_string).collect();
    assert_eq!(loaded, vec!["zeta", "alpha"]);
    assert_eq!(
        harness.log.take(),
        vec!["load:zeta@1.0.0", "load:alpha@1.0.0"]
    );
}

#[test]
fn test_unload_evicts_only_that_module() {
    let harness = RuntimeHarness::new();
    harness.install(&ModuleFixture::new("a"));
    harness.install(&ModuleFixture::new("b"));

    let a_key = test_component_key("a", "a.Svc");
    let b_key = test_component_key("b", "b.Svc");
    let a_home = test_component_key("a", "a.Home");
    harness.runtime.acquire_slot_for(&a_key).unwrap();
    harness.runtime.acquire_slot_for(&b_key).unwrap();
    harness.runtime.singleton_address(&a_home).unwrap();

    assert!(harness.runtime.unload_module(&test_module_id("a")));

    assert!(harness.runtime.address_of(&a_key).is_none());
    assert!(harness.runtime.address_of(&a_home).is_none());
    assert_eq!(harness.runtime.address_of(&b_key).unwrap().slot.name(), "S2");
    // The freed slot is reusable.
    let next = harness
        .runtime
        .acquire_slot_for(&test_component_key("b", "b.Other"))
        .unwrap();
    assert_eq!(next.slot.name(), "S1");
}

#[test]
fn test_replacement_retires_old_handles() {
    let harness = RuntimeHarness::new();
    let fixture = ModuleFixture::new("lib").object("lib.Api", &["Api"]);
    let id = harness.install(&fixture);
    assert_eq!(harness.runtime.load_module(&id).unwrap(), LoadOutcome::Loaded);
    let old = harness.runtime.registry().resolve(&id, "lib.Api").unwrap();

    harness.install(&fixture.clone().version("1.1.0"));
    assert_eq!(harness.runtime.load_module(&id).unwrap(), LoadOutcome::Replaced);

    assert!(!old.is_usable());
    let fresh = harness
        .runtime
        .request_component(&id, "lib.Api", &Capability::contract("Api"))
        .unwrap();
    assert!(fresh.into_object().is_some());
}

#[test]
fn test_overlay_add_remove_swap() {
    let provider = VersionedOverlayProvider::new()
        .failing_for(test_module_id("broken"))
        .none_for(test_module_id("plain"));
    let harness = RuntimeHarness::with_overlay_provider(Arc::new(provider));

    let a = harness.install(&ModuleFixture::new("a"));
    let broken = harness.install(&ModuleFixture::new("broken"));
    let plain = harness.install(&ModuleFixture::new("plain"));
    let report = harness.runtime.load_enabled_modules();

    // Provider failures never block the load.
    assert!(report.failed.is_empty());
    assert!(harness.runtime.is_loaded(&broken));
    assert!(harness.runtime.is_loaded(&plain));
    assert_eq!(harness.overlay_locations(), vec!["a@1.0.0"]);

    harness.install(&ModuleFixture::new("a").version("1.1.0"));
    harness.runtime.load_module(&a).unwrap();
    assert_eq!(harness.overlay_locations(), vec!["a@1.1.0"]);
    assert_eq!(harness.runtime.overlay_of(&a).unwrap().version, "1.1.0");

    harness.runtime.unload_module(&a);
    assert!(harness.overlay_locations().is_empty());
    assert!(harness.runtime.overlay_of(&a).is_none());
}

#[test]
fn test_lazy_load_respects_catalog() {
    let harness = RuntimeHarness::new();
    harness.install(&ModuleFixture::new("off").disabled());

    assert!(matches!(
        harness
            .runtime
            .acquire_slot_for(&test_component_key("off", "off.Svc")),
        Err(RuntimeError::ModuleDisabled(_))
    ));
    assert!(matches!(
        harness
            .runtime
            .acquire_slot_for(&test_component_key("ghost", "ghost.Svc")),
        Err(RuntimeError::UnknownModule(_))
    ));
    assert_eq!(harness.runtime.pool().stats().active, 0);
}

#[test]
fn test_acquire_racing_unload_never_strands_a_binding() {
    let harness = RuntimeHarness::new();
    let id = harness.install(&ModuleFixture::new("alpha"));
    let runtime = Arc::clone(&harness.runtime);

    for round in 0..2_000_u32 {
        runtime.load_module(&id).unwrap();
        let key = test_component_key("alpha", "alpha.Svc").with_instance(format!("t{round}"));
        let acquirer = {
            let runtime = Arc::clone(&runtime);
            let key = key.clone();
            thread::spawn(move || runtime.acquire_slot_for(&key).map(drop))
        };
        runtime.unload_module(&id);
        acquirer.join().unwrap().unwrap();

        // Either the acquire loaded the module again, or the unload evicted
        // the binding.
        if !runtime.is_loaded(&id) {
            assert!(
                runtime.address_of(&key).is_none(),
                "round {round}: binding outlived its module"
            );
        }
        runtime.release_slot_for(&key);
    }
    assert_eq!(runtime.pool().stats().active, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_dependency_disables_and_unloads_module() {
    let harness = RuntimeHarness::new();
    let pump = harness
        .runtime
        .spawn_event_pump(harness.catalog.bus().subscribe());
    let id = harness.install(&ModuleFixture::new("app").with_entry());
    let runtime = Arc::clone(&harness.runtime);
    wait_until("load", || runtime.is_loaded(&id)).await;

    let err = runtime
        .request_component(&id, "net.Client", &Capability::contract("Client"))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Resolve(_)));

    wait_until("disable", || !runtime.is_loaded(&id)).await;
    assert!(!runtime.catalog().module(&id).unwrap().enabled);
    assert!(harness.log.contains("unload:app"));
    pump.abort();
}

#[test]
fn test_failure_policy_sees_the_culprit() {
    let policy = Arc::new(RecordingFailurePolicy::new(FailureAction::Keep));
    let harness = RuntimeHarness::with_failure_policy(policy.clone());
    let lib = harness.install(&ModuleFixture::new("lib").object("lib.Api", &["Api"]));
    let app = harness.install(&ModuleFixture::new("app"));
    assert!(harness.runtime.load_enabled_modules().failed.is_empty());

    assert!(
        harness
            .runtime
            .request_component(&app, "net.Client", &Capability::contract("Client"))
            .is_err()
    );
    assert!(
        harness
            .runtime
            .request_component(&app, "lib.Api", &Capability::Component)
            .is_err()
    );
    // Not a module fault: nothing reported.
    assert!(matches!(
        harness
            .runtime
            .request_component(&test_module_id("ghost"), "x.Y", &Capability::Component),
        Err(RuntimeError::UnknownModule(_))
    ));

    let failures = policy.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].culprit, app);
    assert_eq!(failures[0].kind, FailureKind::MissingDependency);
    assert_eq!(failures[0].symbol, "net.Client");
    assert_eq!(failures[1].culprit, app);
    assert_eq!(failures[1].kind, FailureKind::IncompatibleUpdate);

    // Keep leaves the catalog alone.
    assert!(harness.runtime.catalog().module(&app).unwrap().enabled);
    assert!(harness.runtime.is_loaded(&lib));
}
