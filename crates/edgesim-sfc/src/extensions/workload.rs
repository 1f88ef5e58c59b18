//! Synthetic chain arrival workload.

use rand::distributions::Uniform;

use edgesim_core::Id;

use crate::core::chain::ChainKind;
use crate::core::common::ResourceDemand;
use crate::simulation::{SfcSimulation, StrategyKind};

const KINDS: [ChainKind; 4] = [
    ChainKind::Web,
    ChainKind::Streaming,
    ChainKind::Gaming,
    ChainKind::Compute,
];

/// Deploys chains with Poisson arrivals: exponentially distributed
/// interarrival times and lifetimes, uniformly chosen kinds and anchor
/// sites. All randomness comes from the simulation-wide generator, so runs
/// are reproducible from the seed.
pub struct PoissonWorkload {
    arrival_rate: f64,
    mean_lifetime: f64,
    strategy: StrategyKind,
}

impl PoissonWorkload {
    /// `arrival_rate` is the expected number of chain arrivals per second.
    pub fn new(arrival_rate: f64, mean_lifetime: f64, strategy: StrategyKind) -> Self {
        Self {
            arrival_rate,
            mean_lifetime,
            strategy,
        }
    }

    /// Resource demands of the chain's dependent VMs for the given kind.
    pub fn demand_profile(kind: ChainKind) -> Vec<ResourceDemand> {
        match kind {
            ChainKind::Web => vec![
                ResourceDemand::new(1, 1000., 1024, 100, 2048),
                ResourceDemand::new(1, 1000., 2048, 100, 4096),
            ],
            ChainKind::Streaming => vec![
                ResourceDemand::new(1, 1000., 2048, 1000, 8192),
                ResourceDemand::new(2, 1000., 4096, 1000, 16384),
                ResourceDemand::new(1, 1000., 1024, 500, 4096),
            ],
            ChainKind::Gaming => vec![
                ResourceDemand::new(4, 2000., 4096, 200, 8192),
                ResourceDemand::new(2, 2000., 2048, 200, 4096),
            ],
            ChainKind::Compute => vec![ResourceDemand::new(8, 2000., 16384, 100, 32768)],
        }
    }

    fn exponential(&self, sim: &mut SfcSimulation, mean: f64) -> f64 {
        -(1. - sim.rand()).ln() * mean
    }

    /// Deploys `count` chains anchored at randomly chosen sites from
    /// `anchor_sites` and returns their ids.
    pub fn generate(&self, sim: &mut SfcSimulation, anchor_sites: &[Id], count: u32) -> Vec<u32> {
        let anchor_dist = Uniform::new(0, anchor_sites.len());
        let kind_dist = Uniform::new(0, KINDS.len());
        let mut chains = Vec::with_capacity(count as usize);
        let mut arrival = 0.;
        for _ in 0..count {
            arrival += self.exponential(sim, 1. / self.arrival_rate);
            let lifetime = self.exponential(sim, self.mean_lifetime);
            let kind = KINDS[sim.sample_from_distribution(&kind_dist)];
            let anchor = anchor_sites[sim.sample_from_distribution(&anchor_dist)];
            let chain_id = sim.deploy_chain(
                kind,
                self.strategy,
                anchor,
                Self::demand_profile(kind),
                lifetime,
                arrival,
            );
            chains.push(chain_id);
        }
        chains
    }
}
