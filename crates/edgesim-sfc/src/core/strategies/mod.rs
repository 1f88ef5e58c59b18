//! Placement strategies.
//!
//! The per-chain state machine is parameterized by a narrow strategy
//! contract: the strategy decides which VM goes to which site next, the
//! controller does all event plumbing, bookkeeping and teardown.

pub mod chained_proximity;
pub mod external_solve;
pub mod nearest_retry;

use edgesim_core::Id;

use crate::core::chain::ServiceChain;
use crate::core::common::ChainFailure;
use crate::core::solver::ResourceView;

/// Next move decided by a strategy.
pub enum StrategyCommand {
    /// Issue creation requests for the listed (VM, site) pairs.
    Place(Vec<(u32, Id)>),
    /// Keep waiting for outstanding acknowledgements.
    Wait,
    /// Every VM of the chain is placed.
    Complete,
    /// Give up on the whole chain.
    Abort(ChainFailure),
}

/// Decides placement targets for a single chain.
///
/// Successful placements are recorded into the chain by the controller
/// before `on_ack` is invoked, so strategies read placement state from the
/// chain and only keep their own retry bookkeeping.
pub trait PlacementStrategy {
    /// Called once when the chain enters placement, with the current
    /// per-site free resource view.
    fn begin(&mut self, chain: &ServiceChain, view: &ResourceView) -> StrategyCommand;

    /// Called on every creation acknowledgement.
    fn on_ack(&mut self, chain: &ServiceChain, vm_id: u32, site: Id, success: bool) -> StrategyCommand;
}
