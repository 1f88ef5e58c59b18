//! Boundary to the external placement solver.

use std::collections::BTreeMap;

use serde::Serialize;

use edgesim_core::Id;

use crate::core::common::ResourceDemand;

/// Free resources of a single site, aggregated over its hosts.
#[derive(Clone, Debug, Serialize)]
pub struct SiteResources {
    pub site: Id,
    pub free_cpu_rate: f64,
    pub free_ram: u64,
}

/// Per-site free resource view delivered by monitoring.
pub type ResourceView = Vec<SiteResources>;

/// Snapshot of per-site free resources plus the chain's demands, recreated
/// for every solver invocation.
#[derive(Clone, Debug, Serialize)]
pub struct PlacementRequest {
    pub sites: ResourceView,
    /// Demands of the chain's VMs keyed by VM id.
    pub demands: BTreeMap<u32, ResourceDemand>,
}

/// The external combinatorial solver consumed through a request/response
/// contract. A single call per chain; the contract is all-or-nothing, so
/// `None` means nothing is placed even if a partial mapping would have been
/// feasible.
pub trait PlacementSolver {
    fn solve(&self, request: &PlacementRequest) -> Option<BTreeMap<u32, Id>>;
}

/// Feasibility-only stand-in for the external optimization engine: assigns
/// each VM, in id order, to the first site (in view order) with enough free
/// CPU rate and RAM left, honoring the all-or-nothing contract.
#[derive(Default)]
pub struct GreedySolver;

impl GreedySolver {
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementSolver for GreedySolver {
    fn solve(&self, request: &PlacementRequest) -> Option<BTreeMap<u32, Id>> {
        let mut remaining: Vec<SiteResources> = request.sites.clone();
        let mut mapping = BTreeMap::new();
        for (&vm_id, demand) in &request.demands {
            let slot = remaining
                .iter_mut()
                .find(|site| site.free_cpu_rate >= demand.total_cpu_rate() && site.free_ram >= demand.ram)?;
            slot.free_cpu_rate -= demand.total_cpu_rate();
            slot.free_ram -= demand.ram;
            mapping.insert(vm_id, slot.site);
        }
        Some(mapping)
    }
}
