//! Service chain state.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::Serialize;

use edgesim_core::Id;

use crate::core::common::{ReadableId, ResourceDemand};
use crate::core::vm::VirtualMachine;

/// Kind of the application represented by a chain. Used in records and by
/// the workload generator, has no effect on placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChainKind {
    Web,
    Streaming,
    Gaming,
    Compute,
}

impl Display for ChainKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ChainKind::Web => write!(f, "web"),
            ChainKind::Streaming => write!(f, "streaming"),
            ChainKind::Gaming => write!(f, "gaming"),
            ChainKind::Compute => write!(f, "compute"),
        }
    }
}

/// An ordered, fixed-length sequence of VM roles: a user-anchor VM that is
/// already placed at a fixed site, followed by dependent VMs to be placed.
///
/// The VM-to-site assignment map only grows while placements succeed; the
/// per-VM attempt counters are diagnostic and never drive control flow.
pub struct ServiceChain {
    pub id: u32,
    pub kind: ChainKind,
    anchor_site: Id,
    vms: Vec<VirtualMachine>,
    assignment: IndexMap<u32, Id>,
    attempts: BTreeMap<u32, u32>,
}

impl ServiceChain {
    pub fn new(id: u32, kind: ChainKind, anchor_site: Id, demands: Vec<ResourceDemand>, first_vm_id: u32) -> Self {
        let vms = demands
            .into_iter()
            .enumerate()
            .map(|(i, demand)| VirtualMachine::new(first_vm_id + i as u32, demand))
            .collect();
        Self {
            id,
            kind,
            anchor_site,
            vms,
            assignment: IndexMap::new(),
            attempts: BTreeMap::new(),
        }
    }

    /// Site of the fixed user-anchor VM.
    pub fn anchor_site(&self) -> Id {
        self.anchor_site
    }

    pub fn vms(&self) -> &[VirtualMachine] {
        &self.vms
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.iter().find(|vm| vm.id == vm_id)
    }

    pub fn vm_mut(&mut self, vm_id: u32) -> Option<&mut VirtualMachine> {
        self.vms.iter_mut().find(|vm| vm.id == vm_id)
    }

    /// Ids of not-yet-placed VMs in role order.
    pub fn unplaced(&self) -> Vec<u32> {
        self.vms
            .iter()
            .filter(|vm| !self.assignment.contains_key(&vm.id))
            .map(|vm| vm.id)
            .collect()
    }

    /// First not-yet-placed VM in role order.
    pub fn first_unplaced(&self) -> Option<u32> {
        self.unplaced().first().copied()
    }

    pub fn is_fully_placed(&self) -> bool {
        self.assignment.len() == self.vms.len()
    }

    /// Records a successful placement. The assignment map grows monotonically.
    pub fn assign(&mut self, vm_id: u32, site: Id) {
        self.assignment.insert(vm_id, site);
        if let Some(vm) = self.vm_mut(vm_id) {
            vm.set_site(Some(site));
        }
    }

    pub fn site_of(&self, vm_id: u32) -> Option<Id> {
        self.assignment.get(&vm_id).copied()
    }

    /// Currently placed VMs with their sites, in placement order.
    pub fn placed(&self) -> Vec<(u32, Id)> {
        self.assignment.iter().map(|(&vm, &site)| (vm, site)).collect()
    }

    /// Site path of the chain: the anchor site followed by the sites of
    /// dependent VMs in role order.
    pub fn site_path(&self) -> Vec<Id> {
        let mut path = vec![self.anchor_site];
        for vm in &self.vms {
            if let Some(&site) = self.assignment.get(&vm.id) {
                path.push(site);
            }
        }
        path
    }

    pub fn record_attempt(&mut self, vm_id: u32) {
        *self.attempts.entry(vm_id).or_insert(0) += 1;
    }

    pub fn attempts(&self, vm_id: u32) -> u32 {
        self.attempts.get(&vm_id).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.values().sum()
    }
}

impl ReadableId for ServiceChain {
    fn readable_id(&self) -> String {
        format!("c{}", self.id)
    }
}
