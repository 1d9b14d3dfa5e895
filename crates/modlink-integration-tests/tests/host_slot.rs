//! Integration tests for host slots adopting module components.

use std::sync::Arc;

use modlink_resolver::HostSignal;
use modlink_runtime::{FailureAction, HostSlot, RuntimeError};
use modlink_test::{
    ModuleFixture, RecordingFailurePolicy, RuntimeHarness, test_component_key, test_module_id,
};

fn media() -> RuntimeHarness {
    let harness = RuntimeHarness::new();
    harness.install(
        &ModuleFixture::new("media")
            .component("media.Player")
            .component("media.Home")
            .object("media.Codec", &["Codec"]),
    );
    harness
}

#[test]
fn test_pooled_component_lifecycle() {
    let harness = media();
    let key = test_component_key("media", "media.Player");
    let address = harness.runtime.acquire_slot_for(&key).unwrap();
    let mut slot = HostSlot::new(Arc::clone(&harness.runtime), address.slot.clone());

    slot.on_attach(&address).unwrap();
    assert_eq!(slot.key(), Some(&key));
    assert_eq!(slot.on_start().unwrap(), 1);
    slot.on_state_changed(HostSignal::ConfigurationChanged)
        .unwrap();
    assert_eq!(slot.on_start().unwrap(), 2);
    assert_eq!(slot.on_destroy(), Some(key.clone()));

    assert_eq!(
        harness.log.take(),
        vec![
            "attach:media.Player:S1",
            "create:media.Player",
            "start:media.Player:1",
            "signal:media.Player:ConfigurationChanged",
            "start:media.Player:2",
            "destroy:media.Player",
        ]
    );
    assert!(harness.runtime.address_of(&key).is_none());
    assert_eq!(harness.runtime.pool().stats().available, 2);
}

#[test]
fn test_two_slots_host_two_instances() {
    let harness = media();
    let first_key = test_component_key("media", "media.Player").with_instance("left");
    let second_key = test_component_key("media", "media.Player").with_instance("right");
    let first = harness.runtime.acquire_slot_for(&first_key).unwrap();
    let second = harness.runtime.acquire_slot_for(&second_key).unwrap();

    let mut left = HostSlot::new(Arc::clone(&harness.runtime), first.slot.clone());
    let mut right = HostSlot::new(Arc::clone(&harness.runtime), second.slot.clone());
    left.on_attach(&first).unwrap();
    right.on_attach(&second).unwrap();

    assert!(harness.log.contains("attach:media.Player:S1"));
    assert!(harness.log.contains("attach:media.Player:S2"));
    assert_eq!(
        harness
            .runtime
            .running_instances_for(&test_module_id("media"), "media.Player")
            .len(),
        2
    );

    left.on_destroy();
    assert!(harness.runtime.address_of(&first_key).is_none());
    assert!(harness.runtime.address_of(&second_key).is_some());
}

#[test]
fn test_attach_failure_frees_slot_for_reuse() {
    let harness = media();
    let codec = test_component_key("media", "media.Codec");
    let address = harness.runtime.acquire_slot_for(&codec).unwrap();
    let mut slot = HostSlot::new(Arc::clone(&harness.runtime), address.slot.clone());

    assert!(matches!(
        slot.on_attach(&address),
        Err(RuntimeError::Resolve(_))
    ));
    assert!(harness.runtime.address_of(&codec).is_none());

    // S1 went back to the end of the queue.
    let player = test_component_key("media", "media.Player");
    assert_eq!(
        harness.runtime.acquire_slot_for(&player).unwrap().slot.name(),
        "S2"
    );
    let home = test_component_key("media", "media.Home");
    assert_eq!(
        harness.runtime.acquire_slot_for(&home).unwrap().slot.name(),
        "S1"
    );
}

#[test]
fn test_singleton_rebind_makes_old_address_stale() {
    let harness = media();
    let player = test_component_key("media", "media.Player");
    let home = test_component_key("media", "media.Home");

    let first = harness.runtime.singleton_address(&player).unwrap();
    let second = harness.runtime.singleton_address(&home).unwrap();
    assert_eq!(first.slot, second.slot);

    let mut slot = HostSlot::new(Arc::clone(&harness.runtime), first.slot.clone());
    assert!(matches!(
        slot.on_attach(&first),
        Err(RuntimeError::StaleAddress(_))
    ));
    slot.on_attach(&second).unwrap();
    assert!(harness.log.contains("attach:media.Home:main"));

    slot.on_destroy();
    assert!(harness.runtime.pool().singleton_binding().is_none());
}

#[test]
fn test_unloaded_module_component_can_still_be_destroyed() {
    let harness = media();
    let key = test_component_key("media", "media.Player");
    let address = harness.runtime.acquire_slot_for(&key).unwrap();
    let mut slot = HostSlot::new(Arc::clone(&harness.runtime), address.slot.clone());
    slot.on_attach(&address).unwrap();

    harness.runtime.unload_module(&test_module_id("media"));
    assert!(harness.runtime.address_of(&key).is_none());

    // The instance belongs to the slot; it is shut down normally.
    assert_eq!(slot.on_destroy(), Some(key));
    assert!(harness.log.contains("destroy:media.Player"));
    assert_eq!(harness.runtime.pool().stats().available, 2);
}

#[test]
fn test_attach_of_missing_class_disables_module() {
    let harness = media();
    let media_id = test_module_id("media");
    let key = test_component_key("media", "media.Gone");
    let address = harness.runtime.acquire_slot_for(&key).unwrap();
    let mut slot = HostSlot::new(Arc::clone(&harness.runtime), address.slot.clone());

    assert!(slot.on_attach(&address).is_err());
    assert!(!harness.runtime.catalog().module(&media_id).unwrap().enabled);
    assert!(harness.runtime.address_of(&key).is_none());
}

#[test]
fn test_attach_failure_reaches_custom_policy() {
    let policy = Arc::new(RecordingFailurePolicy::new(FailureAction::Keep));
    let harness = RuntimeHarness::with_failure_policy(policy.clone());
    harness.install(&ModuleFixture::new("media").component("media.Player"));
    let key = test_component_key("media", "media.Gone");
    let address = harness.runtime.acquire_slot_for(&key).unwrap();
    let mut slot = HostSlot::new(Arc::clone(&harness.runtime), address.slot.clone());

    assert!(slot.on_attach(&address).is_err());
    let failures = policy.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].symbol, "media.Gone");
    assert!(
        harness
            .runtime
            .catalog()
            .module(&test_module_id("media"))
            .unwrap()
            .enabled
    );
}
