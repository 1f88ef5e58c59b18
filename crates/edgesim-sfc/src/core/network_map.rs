//! Network delays and hop counts between sites.

use std::collections::HashMap;

use edgesim_core::Id;

/// Stores the network delay and hop count between pairs of sites.
///
/// The map is symmetric, links are registered once per pair. Topology
/// construction itself is out of scope of the placement core, the simulation
/// setup fills the map from its configuration.
#[derive(Default)]
pub struct NetworkMap {
    delays: HashMap<(Id, Id), f64>,
    hops: HashMap<(Id, Id), u32>,
}

impl NetworkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_link(&mut self, a: Id, b: Id, delay: f64, hops: u32) {
        self.delays.insert((a, b), delay);
        self.delays.insert((b, a), delay);
        self.hops.insert((a, b), hops);
        self.hops.insert((b, a), hops);
    }

    /// Network delay between two sites, zero for a site to itself and
    /// infinite for unconnected pairs.
    pub fn delay(&self, a: Id, b: Id) -> f64 {
        if a == b {
            return 0.;
        }
        self.delays.get(&(a, b)).copied().unwrap_or(f64::INFINITY)
    }

    /// Number of network hops between two sites.
    pub fn hop_count(&self, a: Id, b: Id) -> u32 {
        if a == b {
            return 0;
        }
        self.hops.get(&(a, b)).copied().unwrap_or(0)
    }

    /// Total hop count along the given site path.
    pub fn path_hop_count(&self, path: &[Id]) -> u32 {
        path.windows(2).map(|pair| self.hop_count(pair[0], pair[1])).sum()
    }
}
