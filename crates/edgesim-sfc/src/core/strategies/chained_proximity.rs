//! Sequential placement that follows the chain topology.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use edgesim_core::Id;

use crate::core::chain::ServiceChain;
use crate::core::common::ChainFailure;
use crate::core::site_selector::DatacenterSelector;
use crate::core::solver::ResourceView;
use crate::core::strategies::{PlacementStrategy, StrategyCommand};

/// Places VMs one at a time in role order. The first VM targets the site
/// nearest to the user anchor; each subsequent VM first tries co-location
/// with its predecessor. On denial the search re-anchors at the rejecting
/// site, so the fallback is nearest to where the previous VM actually sits
/// rather than to the user.
pub struct ChainedProximity {
    selector: Rc<RefCell<DatacenterSelector>>,
    tried: BTreeSet<Id>,
}

impl ChainedProximity {
    pub fn new(selector: Rc<RefCell<DatacenterSelector>>) -> Self {
        Self {
            selector,
            tried: BTreeSet::new(),
        }
    }

    fn place_at_nearest(&mut self, vm_id: u32, reference: Id) -> StrategyCommand {
        match self.selector.borrow().next_candidate(reference, &self.tried) {
            Some(site) => {
                self.tried.insert(site);
                StrategyCommand::Place(vec![(vm_id, site)])
            }
            None => StrategyCommand::Abort(ChainFailure::PlacementExhausted),
        }
    }
}

impl PlacementStrategy for ChainedProximity {
    fn begin(&mut self, chain: &ServiceChain, _view: &ResourceView) -> StrategyCommand {
        match chain.first_unplaced() {
            Some(vm_id) => self.place_at_nearest(vm_id, chain.anchor_site()),
            None => StrategyCommand::Complete,
        }
    }

    fn on_ack(&mut self, chain: &ServiceChain, vm_id: u32, site: Id, success: bool) -> StrategyCommand {
        self.tried.insert(site);
        if success {
            // Exclusion restarts fresh for the next VM, its first try is
            // co-location with the one just placed.
            self.tried.clear();
            self.tried.insert(site);
            match chain.first_unplaced() {
                Some(next) => StrategyCommand::Place(vec![(next, site)]),
                None => StrategyCommand::Complete,
            }
        } else {
            self.place_at_nearest(vm_id, site)
        }
    }
}
