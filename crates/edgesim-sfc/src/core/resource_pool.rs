//! Per-host resource accounting.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::{AllocationDenied, ReadableId, ResourceDemand};

/// Owns the resources of a single host: a fixed set of CPU units with a
/// per-unit rate, RAM, bandwidth and storage. All mutating operations either
/// fully succeed or fully roll back, so the host can never be over-committed
/// and a failed admission leaves the state untouched.
///
/// VMs that are being migrated in are double-booked on purpose: their claim
/// is visible to all availability queries while the source host still holds
/// the original allocation.
#[derive(Clone)]
pub struct HostPool {
    name: String,
    cpu_units_total: u32,
    cpu_rate: f64,
    ram_total: u64,
    bandwidth_total: u64,
    storage_total: u64,

    cpu_units_free: u32,
    ram_free: u64,
    bandwidth_free: u64,
    storage_free: u64,

    allocations: BTreeMap<u32, ResourceDemand>,
    migrating_in: BTreeSet<u32>,
}

impl HostPool {
    pub fn new(
        name: &str,
        cpu_units: u32,
        cpu_rate: f64,
        ram: u64,
        bandwidth: u64,
        storage: u64,
    ) -> Self {
        Self {
            name: name.to_owned(),
            cpu_units_total: cpu_units,
            cpu_rate,
            ram_total: ram,
            bandwidth_total: bandwidth,
            storage_total: storage,
            cpu_units_free: cpu_units,
            ram_free: ram,
            bandwidth_free: bandwidth,
            storage_free: storage,
            allocations: BTreeMap::new(),
            migrating_in: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admits the VM by committing its whole resource claim.
    ///
    /// Resources are checked in fixed order: storage, RAM, bandwidth, CPU.
    /// The first failing check undoes everything granted within this call and
    /// returns the denial reason, leaving the pool identical to its pre-call
    /// state.
    pub fn allocate(&mut self, vm_id: u32, demand: &ResourceDemand) -> Result<(), AllocationDenied> {
        if self.allocations.contains_key(&vm_id) {
            return Ok(());
        }
        if self.storage_free < demand.storage {
            return Err(AllocationDenied::Storage);
        }
        self.storage_free -= demand.storage;

        if self.ram_free < demand.ram {
            self.storage_free += demand.storage;
            return Err(AllocationDenied::Ram);
        }
        self.ram_free -= demand.ram;

        if self.bandwidth_free < demand.bandwidth {
            self.storage_free += demand.storage;
            self.ram_free += demand.ram;
            return Err(AllocationDenied::Bandwidth);
        }
        self.bandwidth_free -= demand.bandwidth;

        if self.cpu_units_free < demand.cpu_units || self.cpu_rate < demand.cpu_rate {
            self.storage_free += demand.storage;
            self.ram_free += demand.ram;
            self.bandwidth_free += demand.bandwidth;
            return Err(AllocationDenied::Cpu);
        }
        self.cpu_units_free -= demand.cpu_units;

        self.allocations.insert(vm_id, demand.clone());
        Ok(())
    }

    /// Returns the VM's resources to the pool. No-op if the VM is not hosted
    /// here.
    pub fn release(&mut self, vm_id: u32) {
        if let Some(demand) = self.allocations.remove(&vm_id) {
            self.storage_free += demand.storage;
            self.ram_free += demand.ram;
            self.bandwidth_free += demand.bandwidth;
            self.cpu_units_free += demand.cpu_units;
            self.migrating_in.remove(&vm_id);
        }
    }

    /// Releases every hosted VM. Used on host teardown.
    pub fn release_all(&mut self) {
        let vm_ids: Vec<u32> = self.allocations.keys().cloned().collect();
        for vm_id in vm_ids {
            self.release(vm_id);
        }
    }

    /// Reserves resources for a VM migrating in from another host.
    ///
    /// The admission checks are identical to [`allocate`](Self::allocate),
    /// but the VM is additionally marked as migrating-in. The claim is
    /// visible to capacity queries before the source host has released the
    /// original allocation.
    pub fn begin_migration_in(&mut self, vm_id: u32, demand: &ResourceDemand) -> Result<(), AllocationDenied> {
        self.allocate(vm_id, demand)?;
        self.migrating_in.insert(vm_id);
        Ok(())
    }

    /// Commits an in-flight migration by clearing the migrating-in marker.
    pub fn complete_migration_in(&mut self, vm_id: u32) {
        self.migrating_in.remove(&vm_id);
    }

    /// Unwinds an in-flight migration, returning the reserved resources.
    pub fn cancel_migration_in(&mut self, vm_id: u32) {
        if self.migrating_in.remove(&vm_id) {
            self.release(vm_id);
        }
    }

    /// Read-only admission predicate used by host selection heuristics.
    pub fn is_suitable(&self, demand: &ResourceDemand) -> bool {
        self.cpu_rate >= demand.cpu_rate
            && self.available_cpu_rate() >= demand.total_cpu_rate()
            && self.cpu_units_free >= demand.cpu_units
            && self.ram_free >= demand.ram
            && self.bandwidth_free >= demand.bandwidth
            && self.storage_free >= demand.storage
    }

    pub fn contains_vm(&self, vm_id: u32) -> bool {
        self.allocations.contains_key(&vm_id)
    }

    pub fn is_migrating_in(&self, vm_id: u32) -> bool {
        self.migrating_in.contains(&vm_id)
    }

    pub fn vm_demand(&self, vm_id: u32) -> Option<&ResourceDemand> {
        self.allocations.get(&vm_id)
    }

    pub fn vms(&self) -> impl Iterator<Item = &u32> {
        self.allocations.keys()
    }

    pub fn vm_count(&self) -> usize {
        self.allocations.len()
    }

    pub fn free_units(&self) -> u32 {
        self.cpu_units_free
    }

    pub fn total_units(&self) -> u32 {
        self.cpu_units_total
    }

    /// Rate of a single CPU unit.
    pub fn unit_rate(&self) -> f64 {
        self.cpu_rate
    }

    /// Aggregate free CPU rate over all free units.
    pub fn available_cpu_rate(&self) -> f64 {
        self.cpu_units_free as f64 * self.cpu_rate
    }

    /// Aggregate CPU rate of the whole host.
    pub fn total_cpu_rate(&self) -> f64 {
        self.cpu_units_total as f64 * self.cpu_rate
    }

    pub fn available_ram(&self) -> u64 {
        self.ram_free
    }

    pub fn available_bandwidth(&self) -> u64 {
        self.bandwidth_free
    }

    pub fn available_storage(&self) -> u64 {
        self.storage_free
    }
}

impl ReadableId for HostPool {
    fn readable_id(&self) -> String {
        self.name.clone()
    }
}
