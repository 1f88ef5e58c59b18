//! Placement driven by an external optimization solver.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use edgesim_core::Id;

use crate::core::chain::ServiceChain;
use crate::core::common::ChainFailure;
use crate::core::solver::{PlacementRequest, PlacementSolver, ResourceView};
use crate::core::strategies::{PlacementStrategy, StrategyCommand};

/// Obtains a full VM-to-site mapping from the solver up front, then places
/// the VMs one at a time in role order exactly where the solver said.
///
/// There is no retry path: a denial means the resource view the solver
/// worked from has gone stale, and the chain is aborted.
pub struct ExternalSolve {
    solver: Rc<RefCell<Box<dyn PlacementSolver>>>,
    mapping: BTreeMap<u32, Id>,
}

impl ExternalSolve {
    pub fn new(solver: Rc<RefCell<Box<dyn PlacementSolver>>>) -> Self {
        Self {
            solver,
            mapping: BTreeMap::new(),
        }
    }

    fn place_next(&self, chain: &ServiceChain) -> StrategyCommand {
        match chain.first_unplaced() {
            Some(vm_id) => match self.mapping.get(&vm_id) {
                Some(&site) => StrategyCommand::Place(vec![(vm_id, site)]),
                None => StrategyCommand::Abort(ChainFailure::SolverNoSolution),
            },
            None => StrategyCommand::Complete,
        }
    }
}

impl PlacementStrategy for ExternalSolve {
    fn begin(&mut self, chain: &ServiceChain, view: &ResourceView) -> StrategyCommand {
        if chain.first_unplaced().is_none() {
            return StrategyCommand::Complete;
        }
        let request = PlacementRequest {
            sites: view.clone(),
            demands: chain.vms().iter().map(|vm| (vm.id, vm.demand.clone())).collect(),
        };
        match self.solver.borrow().solve(&request) {
            Some(mapping) => {
                self.mapping = mapping;
                self.place_next(chain)
            }
            None => StrategyCommand::Abort(ChainFailure::SolverNoSolution),
        }
    }

    fn on_ack(&mut self, chain: &ServiceChain, _vm_id: u32, _site: Id, success: bool) -> StrategyCommand {
        if !success {
            return StrategyCommand::Abort(ChainFailure::PlacementStale);
        }
        self.place_next(chain)
    }
}
