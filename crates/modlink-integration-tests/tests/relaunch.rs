//! Integration tests for chain relaunch of dependent modules.

use modlink_core::{Capability, ModuleId};
use modlink_runtime::RuntimeError;
use modlink_test::{ModuleFixture, RuntimeHarness, test_component_key, test_module_id};

/// core <- ui <- app, plus an unrelated module.
fn chain() -> (RuntimeHarness, [ModuleId; 4]) {
    let harness = RuntimeHarness::new();
    let core = harness.install(&ModuleFixture::new("core").with_entry().object("core.Api", &["Api"]));
    let ui = harness.install(&ModuleFixture::new("ui").with_entry().object("ui.Api", &["Api"]));
    let app = harness.install(&ModuleFixture::new("app").with_entry());
    let other = harness.install(&ModuleFixture::new("other").with_entry());
    harness.runtime.load_enabled_modules();

    let api = Capability::contract("Api");
    harness.runtime.request_component(&ui, "core.Api", &api).unwrap();
    harness.runtime.request_component(&app, "ui.Api", &api).unwrap();
    let _ = harness.log.take();
    (harness, [core, ui, app, other])
}

#[test]
fn test_relaunch_orders_unload_and_load() {
    let (harness, [core, ui, app, other]) = chain();

    let restarted = harness.runtime.relaunch_module(&core).unwrap();
    assert_eq!(restarted, vec![core, ui, app]);
    assert_eq!(
        harness.log.take(),
        vec![
            "unload:app",
            "unload:ui",
            "unload:core",
            "load:core@1.0.0",
            "load:ui@1.0.0",
            "load:app@1.0.0",
        ]
    );
    assert!(harness.runtime.is_loaded(&other));
}

#[test]
fn test_relaunch_of_middle_module() {
    let (harness, [core, ui, app, _]) = chain();

    let restarted = harness.runtime.relaunch_module(&ui).unwrap();
    assert_eq!(restarted, vec![ui, app]);
    assert!(harness.runtime.is_loaded(&core));
    assert!(!harness.log.contains("unload:core"));
}

#[test]
fn test_relaunch_leaf_restarts_only_itself() {
    let (harness, [_, _, app, _]) = chain();
    let restarted = harness.runtime.relaunch_module(&app).unwrap();
    assert_eq!(restarted, vec![app]);
    assert_eq!(harness.log.take(), vec!["unload:app", "load:app@1.0.0"]);
}

#[test]
fn test_relaunch_evicts_dependent_slots() {
    let (harness, [core, ..]) = chain();
    let app_key = test_component_key("app", "app.Svc");
    let other_key = test_component_key("other", "other.Svc");
    harness.runtime.acquire_slot_for(&app_key).unwrap();
    harness.runtime.acquire_slot_for(&other_key).unwrap();

    harness.runtime.relaunch_module(&core).unwrap();
    assert!(harness.runtime.address_of(&app_key).is_none());
    assert!(harness.runtime.address_of(&other_key).is_some());
}

#[test]
fn test_relaunch_picks_up_new_code() {
    let (harness, [core, ..]) = chain();
    harness.install_code(
        &ModuleFixture::new("core")
            .with_entry()
            .object("core.Api", &["Api"])
            .object("core.Extra", &["Api"]),
    );

    harness.runtime.relaunch_module(&core).unwrap();
    let extra = harness
        .runtime
        .request_component(&test_module_id("app"), "core.Extra", &Capability::contract("Api"))
        .unwrap()
        .into_object()
        .unwrap();
    assert_eq!(extra.downcast_ref::<String>().unwrap(), "core.Extra@core");
}

#[test]
fn test_relaunch_failure_names_modules() {
    let (harness, [core, ui, app, _]) = chain();
    harness.catalog.set_enabled(&app, false).unwrap();

    let err = harness.runtime.relaunch_module(&core).unwrap_err();
    match err {
        RuntimeError::RelaunchFailed { module, failed } => {
            assert_eq!(module, core);
            assert_eq!(failed, vec![app.clone()]);
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.runtime.is_loaded(&core));
    assert!(harness.runtime.is_loaded(&ui));
    assert!(!harness.runtime.is_loaded(&app));
}

#[test]
fn test_relaunch_disabled_module_is_rejected_up_front() {
    let (harness, [core, ..]) = chain();
    harness.catalog.set_enabled(&core, false).unwrap();

    assert!(matches!(
        harness.runtime.relaunch_module(&core),
        Err(RuntimeError::ModuleDisabled(_))
    ));
    assert!(harness.runtime.is_loaded(&core));
    assert!(harness.log.is_empty());
}

#[test]
fn test_relaunch_diamond_respects_dependency_order() {
    // a needs core and z, z needs core.
    let harness = RuntimeHarness::new();
    let core = harness.install(&ModuleFixture::new("core").with_entry().object("core.Api", &["Api"]));
    let z = harness.install(&ModuleFixture::new("z").with_entry().object("z.Api", &["Api"]));
    let a = harness.install(&ModuleFixture::new("a").with_entry());
    harness.runtime.load_enabled_modules();

    let api = Capability::contract("Api");
    harness.runtime.request_component(&a, "core.Api", &api).unwrap();
    harness.runtime.request_component(&z, "core.Api", &api).unwrap();
    harness.runtime.request_component(&a, "z.Api", &api).unwrap();
    let _ = harness.log.take();

    let restarted = harness.runtime.relaunch_module(&core).unwrap();
    assert_eq!(restarted, vec![core, z, a]);
    assert_eq!(
        harness.log.take(),
        vec![
            "unload:a",
            "unload:z",
            "unload:core",
            "load:core@1.0.0",
            "load:z@1.0.0",
            "load:a@1.0.0",
        ]
    );
}
