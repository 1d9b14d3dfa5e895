//! Integration tests for the slot multiplexer.
//!
//! Exercises the pool directly and through the runtime's caller API,
//! including concurrent use from several threads.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use modlink_core::ComponentKey;
use modlink_runtime::RuntimeError;
use modlink_slots::{SlotError, SlotPool};
use modlink_test::{ModuleFixture, RuntimeHarness, test_component_key, test_module_id};

fn pool(names: &[&str]) -> SlotPool {
    let pool = SlotPool::new();
    pool.configure_pool(names.iter().copied()).unwrap();
    pool
}

/// Every active slot is bound to exactly one key.
fn assert_bindings_unique(pool: &SlotPool) {
    let bindings = pool.bindings();
    let slots: HashSet<String> = bindings
        .iter()
        .map(|(_, slot)| slot.name().to_owned())
        .collect();
    assert_eq!(slots.len(), bindings.len(), "slot bound twice: {bindings:?}");
}

#[test]
fn test_two_slot_scenario() {
    let pool = pool(&["S1", "S2"]);
    let x = test_component_key("m", "m.X");
    let y = test_component_key("m", "m.Y");
    let z = test_component_key("m", "m.Z");

    assert_eq!(pool.acquire(&x).unwrap().name(), "S1");
    assert_eq!(pool.acquire(&y).unwrap().name(), "S2");
    assert!(matches!(
        pool.acquire(&z),
        Err(SlotError::Exhausted { capacity: 2, .. })
    ));
    assert_eq!(pool.bindings().len(), 2);

    assert_eq!(pool.release(&x).unwrap().name(), "S1");
    assert_eq!(pool.acquire(&z).unwrap().name(), "S1");
    assert_eq!(pool.lookup(&y).unwrap().name(), "S2");
}

#[test]
fn test_acquire_is_idempotent() {
    let pool = pool(&["S1", "S2", "S3"]);
    let key = test_component_key("m", "m.Svc");
    let first = pool.acquire(&key).unwrap();
    let second = pool.acquire(&key).unwrap();

    assert_eq!(first, second);
    let stats = pool.stats();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.available, 2);
}

#[test]
fn test_round_trip_restores_available_count() {
    let pool = pool(&["S1", "S2", "S3"]);
    let before = pool.stats().available;
    let keys: Vec<ComponentKey> = ["a", "b", "c"]
        .iter()
        .map(|tag| test_component_key("m", "m.Svc").with_instance(*tag))
        .collect();

    for key in &keys {
        pool.acquire(key).unwrap();
    }
    assert_eq!(pool.stats().available, 0);
    for key in &keys {
        pool.release(key).unwrap();
    }
    assert_eq!(pool.stats().available, before);
    assert!(pool.bindings().is_empty());
}

#[test]
fn test_exhaustion_keeps_existing_bindings() {
    let pool = pool(&["S1", "S2"]);
    let held: Vec<ComponentKey> = ["a", "b"]
        .iter()
        .map(|tag| test_component_key("m", "m.Svc").with_instance(*tag))
        .collect();
    for key in &held {
        pool.acquire(key).unwrap();
    }

    for tag in ["c", "d", "e"] {
        let key = test_component_key("m", "m.Svc").with_instance(tag);
        assert!(pool.acquire(&key).is_err());
    }

    let bound: Vec<ComponentKey> = pool.bindings().into_iter().map(|(k, _)| k).collect();
    assert_eq!(bound, held);
}

#[test]
fn test_concurrent_disjoint_keys_respect_capacity() {
    const CAPACITY: usize = 4;
    let pool = Arc::new(pool(&["S1", "S2", "S3", "S4"]));

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let key = test_component_key("m", "m.Worker").with_instance(worker.to_string());
                for _ in 0..200 {
                    match pool.acquire(&key) {
                        Ok(slot) => {
                            assert_eq!(pool.lookup(&key), Some(slot));
                            assert!(pool.stats().active <= CAPACITY);
                            pool.release(&key).unwrap();
                        },
                        Err(SlotError::Exhausted { capacity, .. }) => {
                            assert_eq!(capacity, CAPACITY);
                        },
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();

    // Sample the shared state while the workers run.
    for _ in 0..200 {
        assert!(pool.stats().active <= CAPACITY);
        assert_bindings_unique(&pool);
    }

    for worker in workers {
        worker.join().unwrap();
    }
    let stats = pool.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.available, CAPACITY);
}

#[test]
fn test_runtime_exhaustion_surfaces_slot_error() {
    let harness = RuntimeHarness::with_slots(None, &["S1"]);
    harness.install(&ModuleFixture::new("m"));

    let first = test_component_key("m", "m.Svc").with_instance("1");
    let second = test_component_key("m", "m.Svc").with_instance("2");
    harness.runtime.acquire_slot_for(&first).unwrap();

    let err = harness.runtime.acquire_slot_for(&second).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Slot(SlotError::Exhausted { capacity: 1, .. })
    ));
    assert!(matches!(
        harness.runtime.singleton_address(&second),
        Err(RuntimeError::Slot(SlotError::Unconfigured(_)))
    ));
}

#[test]
fn test_running_instances_listed_per_class() {
    let harness = RuntimeHarness::with_slots(None, &["S1", "S2", "S3"]);
    let id = harness.install(&ModuleFixture::new("m"));

    for tag in ["b", "a"] {
        harness
            .runtime
            .acquire_slot_for(&test_component_key("m", "m.Svc").with_instance(tag))
            .unwrap();
    }
    harness
        .runtime
        .acquire_slot_for(&test_component_key("m", "m.Other"))
        .unwrap();

    let tags: Vec<_> = harness
        .runtime
        .running_instances_for(&test_module_id("m"), "m.Svc")
        .iter()
        .map(|k| k.instance().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(tags, vec!["a", "b"]);
    assert_eq!(harness.runtime.running_instances_for(&id, "m.Missing").len(), 0);
}
