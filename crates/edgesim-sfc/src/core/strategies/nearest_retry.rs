//! Whole-batch placement at the delay-nearest untried site.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use edgesim_core::Id;

use crate::core::chain::ServiceChain;
use crate::core::common::ChainFailure;
use crate::core::site_selector::DatacenterSelector;
use crate::core::solver::ResourceView;
use crate::core::strategies::{PlacementStrategy, StrategyCommand};

/// Requests all remaining VMs of the chain at the untried site nearest to
/// the user anchor, then retries the leftovers at the next-nearest site
/// until the chain is placed or no untried site remains.
pub struct NearestRetry {
    selector: Rc<RefCell<DatacenterSelector>>,
    tried: BTreeSet<Id>,
    outstanding: usize,
}

impl NearestRetry {
    pub fn new(selector: Rc<RefCell<DatacenterSelector>>) -> Self {
        Self {
            selector,
            tried: BTreeSet::new(),
            outstanding: 0,
        }
    }

    fn next_round(&mut self, chain: &ServiceChain) -> StrategyCommand {
        let pending = chain.unplaced();
        if pending.is_empty() {
            return StrategyCommand::Complete;
        }
        match self.selector.borrow().next_candidate(chain.anchor_site(), &self.tried) {
            Some(site) => {
                self.tried.insert(site);
                self.outstanding = pending.len();
                StrategyCommand::Place(pending.into_iter().map(|vm| (vm, site)).collect())
            }
            None => StrategyCommand::Abort(ChainFailure::PlacementExhausted),
        }
    }
}

impl PlacementStrategy for NearestRetry {
    fn begin(&mut self, chain: &ServiceChain, _view: &ResourceView) -> StrategyCommand {
        self.next_round(chain)
    }

    fn on_ack(&mut self, chain: &ServiceChain, _vm_id: u32, _site: Id, _success: bool) -> StrategyCommand {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding > 0 {
            return StrategyCommand::Wait;
        }
        self.next_round(chain)
    }
}
