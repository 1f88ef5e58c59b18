//! Registry of currently active chains.

use std::collections::BTreeMap;

use edgesim_core::Id;

use crate::core::chain::ChainKind;

/// Entry describing one active chain.
#[derive(Clone, Debug)]
pub struct ActiveChain {
    pub kind: ChainKind,
    pub owner: Id,
}

/// Process-wide view of chains that are currently running.
///
/// The registry is an explicit value owned by the top-level simulation and
/// passed to the components that need it; it is consulted by monitoring and
/// by admission heuristics that read system-wide load.
#[derive(Default)]
pub struct ChainRegistry {
    chains: BTreeMap<u32, ActiveChain>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chain_id: u32, kind: ChainKind, owner: Id) {
        self.chains.insert(chain_id, ActiveChain { kind, owner });
    }

    /// Removes the chain. No-op if it is not registered.
    pub fn remove(&mut self, chain_id: u32) {
        self.chains.remove(&chain_id);
    }

    pub fn contains(&self, chain_id: u32) -> bool {
        self.chains.contains_key(&chain_id)
    }

    pub fn active_count(&self) -> usize {
        self.chains.len()
    }

    pub fn active_chains(&self) -> impl Iterator<Item = (&u32, &ActiveChain)> {
        self.chains.iter()
    }
}
