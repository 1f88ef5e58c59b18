use edgesim_sfc::core::common::{AllocationDenied, ResourceDemand};
use edgesim_sfc::core::resource_pool::HostPool;

fn pool() -> HostPool {
    HostPool::new("h1", 8, 2000., 16384, 10000, 65536)
}

fn demand() -> ResourceDemand {
    ResourceDemand::new(2, 2000., 4096, 1000, 8192)
}

#[test]
// No sequence of admissions may bring any free counter below zero.
fn test_capacity_invariant() {
    let mut pool = pool();
    let mut admitted = 0;
    for vm_id in 0..100 {
        if pool.allocate(vm_id, &demand()).is_ok() {
            admitted += 1;
        }
    }
    // 8 units / 2 per VM caps admission at 4 VMs.
    assert_eq!(admitted, 4);
    assert_eq!(pool.free_units(), 0);
    assert_eq!(pool.available_ram(), 16384 - 4 * 4096);
    assert_eq!(pool.available_bandwidth(), 10000 - 4 * 1000);
    assert_eq!(pool.available_storage(), 65536 - 4 * 8192);
    assert_eq!(pool.vm_count(), 4);
}

#[test]
// An admission failing on RAM must leave every counter untouched, including
// the storage granted before the RAM check.
fn test_atomic_admission() {
    let mut pool = pool();
    let oversized = ResourceDemand::new(1, 2000., 32768, 100, 1024);
    let result = pool.allocate(1, &oversized);
    assert_eq!(result, Err(AllocationDenied::Ram));
    assert!(!pool.contains_vm(1));
    assert_eq!(pool.free_units(), 8);
    assert_eq!(pool.available_ram(), 16384);
    assert_eq!(pool.available_bandwidth(), 10000);
    assert_eq!(pool.available_storage(), 65536);
}

#[test]
// Denial reasons follow the fixed check order: storage, RAM, bandwidth, CPU.
fn test_denial_order() {
    let mut pool = pool();
    assert_eq!(
        pool.allocate(1, &ResourceDemand::new(1, 2000., 99999, 99999, 99999)),
        Err(AllocationDenied::Storage)
    );
    assert_eq!(
        pool.allocate(1, &ResourceDemand::new(1, 2000., 99999, 99999, 1024)),
        Err(AllocationDenied::Ram)
    );
    assert_eq!(
        pool.allocate(1, &ResourceDemand::new(1, 2000., 1024, 99999, 1024)),
        Err(AllocationDenied::Bandwidth)
    );
    assert_eq!(
        pool.allocate(1, &ResourceDemand::new(99, 2000., 1024, 100, 1024)),
        Err(AllocationDenied::Cpu)
    );
    // A unit rate above what the host offers is a CPU denial too.
    assert_eq!(
        pool.allocate(1, &ResourceDemand::new(1, 4000., 1024, 100, 1024)),
        Err(AllocationDenied::Cpu)
    );
    assert_eq!(pool.vm_count(), 0);
    assert_eq!(pool.available_storage(), 65536);
}

#[test]
fn test_release_returns_resources() {
    let mut pool = pool();
    pool.allocate(1, &demand()).unwrap();
    pool.allocate(2, &demand()).unwrap();
    pool.release(1);
    assert!(!pool.contains_vm(1));
    assert!(pool.contains_vm(2));
    assert_eq!(pool.free_units(), 6);
    assert_eq!(pool.available_ram(), 16384 - 4096);
    // Releasing an unknown VM changes nothing.
    pool.release(42);
    assert_eq!(pool.free_units(), 6);
}

#[test]
fn test_release_all() {
    let mut pool = pool();
    for vm_id in 1..=3 {
        pool.allocate(vm_id, &demand()).unwrap();
    }
    pool.release_all();
    assert_eq!(pool.vm_count(), 0);
    assert_eq!(pool.free_units(), 8);
    assert_eq!(pool.available_ram(), 16384);
    assert_eq!(pool.available_bandwidth(), 10000);
    assert_eq!(pool.available_storage(), 65536);
}

#[test]
// Repeated admission of the same VM is a no-op, not a second booking.
fn test_idempotent_allocate() {
    let mut pool = pool();
    pool.allocate(1, &demand()).unwrap();
    pool.allocate(1, &demand()).unwrap();
    assert_eq!(pool.vm_count(), 1);
    assert_eq!(pool.free_units(), 6);
}

#[test]
// Migration begin followed by cancel restores the exact pre-call state.
fn test_migration_round_trip() {
    let mut pool = pool();
    pool.allocate(1, &demand()).unwrap();
    let free_units = pool.free_units();
    let free_ram = pool.available_ram();
    let free_bw = pool.available_bandwidth();
    let free_storage = pool.available_storage();

    pool.begin_migration_in(2, &demand()).unwrap();
    assert!(pool.is_migrating_in(2));
    assert_eq!(pool.free_units(), free_units - 2);

    pool.cancel_migration_in(2);
    assert!(!pool.contains_vm(2));
    assert!(!pool.is_migrating_in(2));
    assert_eq!(pool.free_units(), free_units);
    assert_eq!(pool.available_ram(), free_ram);
    assert_eq!(pool.available_bandwidth(), free_bw);
    assert_eq!(pool.available_storage(), free_storage);
}

#[test]
// Completing a migration keeps the allocation and only clears the marker.
fn test_migration_complete() {
    let mut pool = pool();
    pool.begin_migration_in(1, &demand()).unwrap();
    pool.complete_migration_in(1);
    assert!(pool.contains_vm(1));
    assert!(!pool.is_migrating_in(1));
    // Cancel after completion must not release the committed allocation.
    pool.cancel_migration_in(1);
    assert!(pool.contains_vm(1));
}

#[test]
fn test_is_suitable() {
    let mut pool = pool();
    assert!(pool.is_suitable(&demand()));
    for vm_id in 1..=4 {
        pool.allocate(vm_id, &demand()).unwrap();
    }
    assert!(!pool.is_suitable(&demand()));
    // Per-unit rate above what the host offers is unsuitable even when idle.
    let idle = HostPool::new("h2", 8, 2000., 16384, 10000, 65536);
    assert!(!idle.is_suitable(&ResourceDemand::new(1, 4000., 16, 1, 16)));
}
