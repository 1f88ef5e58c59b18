use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use edgesim_core::simulation::Simulation;

use edgesim_sfc::core::chain::ChainKind;
use edgesim_sfc::core::common::ResourceDemand;
use edgesim_sfc::core::config::SimulationConfig;
use edgesim_sfc::core::network_map::NetworkMap;
use edgesim_sfc::core::service::ChainStatus;
use edgesim_sfc::core::site_selector::DatacenterSelector;
use edgesim_sfc::simulation::{SfcSimulation, StrategyKind};

fn make_sim() -> SfcSimulation {
    SfcSimulation::new(Simulation::new(123), SimulationConfig::default())
}

fn small_demand() -> ResourceDemand {
    ResourceDemand::new(1, 1000., 4096, 100, 1024)
}

#[test]
// Ties in delay are broken by first-seen site order, and sites reserved for
// user hosting are never candidates.
fn test_selector_ordering() {
    let network = Rc::new(RefCell::new(NetworkMap::new()));
    let mut selector = DatacenterSelector::new(network.clone());
    selector.add_site(1, true);
    selector.add_site(2, false);
    selector.add_site(3, false);
    network.borrow_mut().add_link(0, 1, 0.1, 1);
    network.borrow_mut().add_link(0, 2, 5.0, 1);
    network.borrow_mut().add_link(0, 3, 5.0, 1);

    assert_eq!(selector.next_candidate(0, &BTreeSet::new()), Some(2));
    assert_eq!(selector.next_candidate(0, &BTreeSet::from([2])), Some(3));
    assert_eq!(selector.next_candidate(0, &BTreeSet::from([2, 3])), None);
    assert_eq!(selector.placement_sites(), vec![2, 3]);
}

#[test]
// Three candidate sites where only the farthest can host the chain: the
// strategy must run exactly one batch round per site, so every VM collects
// three attempts before the chain is running.
fn test_nearest_retry_termination() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    let dc2 = sim.add_site("dc2", false);
    let dc3 = sim.add_site("dc3", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    // dc1 and dc2 are too small even for a single VM.
    sim.add_host(dc1, "h1", 4, 2000., 1024, 10000, 65536);
    sim.add_host(dc2, "h1", 4, 2000., 1024, 10000, 65536);
    sim.add_host(dc3, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);
    sim.add_link(users, dc2, 2.0, 1);
    sim.add_link(users, dc3, 3.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand(), small_demand()],
        100.,
        0.,
    );
    sim.step_for_duration(50.);

    let controller = sim.controller(chain_id);
    let controller = controller.borrow();
    assert_eq!(controller.status(), ChainStatus::Running);
    let chain = controller.chain();
    let vms: Vec<u32> = chain.vms().iter().map(|vm| vm.id).collect();
    for &vm_id in &vms {
        assert_eq!(chain.attempts(vm_id), 3);
        assert_eq!(chain.site_of(vm_id), Some(dc3));
    }
    assert_eq!(chain.total_attempts(), 6);
    assert!(sim.registry().borrow().contains(chain_id));
    assert_eq!(sim.broker().borrow().completed().len(), 1);
}

#[test]
// When the nearest site can host only part of the batch, the leftovers are
// retried at the next-nearest site while the placed VMs stay put.
fn test_nearest_retry_partial_batch() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    let dc2 = sim.add_site("dc2", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    // Fits exactly one VM of the chain.
    sim.add_host(dc1, "h1", 1, 1000., 4096, 10000, 65536);
    sim.add_host(dc2, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);
    sim.add_link(users, dc2, 2.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand(), small_demand()],
        100.,
        0.,
    );
    sim.step_for_duration(50.);

    let controller = sim.controller(chain_id);
    let controller = controller.borrow();
    assert_eq!(controller.status(), ChainStatus::Running);
    let chain = controller.chain();
    let first = chain.vms()[0].id;
    let second = chain.vms()[1].id;
    assert_eq!(chain.site_of(first), Some(dc1));
    assert_eq!(chain.site_of(second), Some(dc2));
    assert_eq!(chain.attempts(first), 1);
    assert_eq!(chain.attempts(second), 2);
}

#[test]
// With enough capacity nearby the chained strategy co-locates the whole
// chain at the site nearest to the user.
fn test_chained_proximity_colocation() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    let dc2 = sim.add_site("dc2", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(dc1, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_host(dc2, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);
    sim.add_link(users, dc2, 2.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::ChainedProximity,
        users,
        vec![small_demand(), small_demand()],
        100.,
        0.,
    );
    sim.step_for_duration(50.);

    let controller = sim.controller(chain_id);
    let controller = controller.borrow();
    assert_eq!(controller.status(), ChainStatus::Running);
    let chain = controller.chain();
    for vm in chain.vms() {
        assert_eq!(chain.site_of(vm.id), Some(dc1));
        assert_eq!(chain.attempts(vm.id), 1);
    }
}

#[test]
// After a denial the chained strategy re-anchors at the rejecting site: the
// fallback for the second VM is the site nearest to B (where the first VM
// sits), not the site nearest to the user.
fn test_chained_proximity_reanchoring() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let a = sim.add_site("a", false);
    let b = sim.add_site("b", false);
    let c = sim.add_site("c", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(a, "h1", 8, 2000., 16384, 10000, 65536);
    // Fits exactly one VM, so the co-location attempt for the second VM fails.
    sim.add_host(b, "h1", 1, 1000., 4096, 10000, 65536);
    sim.add_host(c, "h1", 8, 2000., 16384, 10000, 65536);
    // B is nearest to the user; from B the nearest fallback is C, while a
    // user-anchored search would have preferred A.
    sim.add_link(users, b, 5.0, 1);
    sim.add_link(users, a, 6.0, 1);
    sim.add_link(users, c, 8.0, 1);
    sim.add_link(b, c, 2.0, 1);
    sim.add_link(b, a, 10.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::ChainedProximity,
        users,
        vec![small_demand(), small_demand()],
        100.,
        0.,
    );
    sim.step_for_duration(50.);

    let controller = sim.controller(chain_id);
    let controller = controller.borrow();
    assert_eq!(controller.status(), ChainStatus::Running);
    let chain = controller.chain();
    let first = chain.vms()[0].id;
    let second = chain.vms()[1].id;
    assert_eq!(chain.site_of(first), Some(b));
    assert_eq!(chain.site_of(second), Some(c));
    assert_eq!(chain.attempts(first), 1);
    assert_eq!(chain.attempts(second), 2);
}

#[test]
// With no site able to host the chain the strategy runs out of candidates
// and the chain fails without leaving anything allocated.
fn test_placement_exhausted() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    let dc2 = sim.add_site("dc2", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(dc1, "h1", 1, 1000., 1024, 10000, 65536);
    sim.add_host(dc2, "h1", 1, 1000., 1024, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);
    sim.add_link(users, dc2, 2.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand()],
        100.,
        0.,
    );
    sim.step_for_duration(50.);

    let controller = sim.controller(chain_id);
    assert_eq!(controller.borrow().status(), ChainStatus::Terminated);
    assert_eq!(sim.broker().borrow().failed().len(), 1);
    assert_eq!(sim.broker().borrow().completed().len(), 0);
    assert_eq!(sim.site(dc1).borrow().pool(0).vm_count(), 0);
    assert_eq!(sim.site(dc2).borrow().pool(0).vm_count(), 0);
}
