use edgesim_core::simulation::Simulation;

use edgesim_sfc::core::chain::ChainKind;
use edgesim_sfc::core::common::ResourceDemand;
use edgesim_sfc::core::config::SimulationConfig;
use edgesim_sfc::core::service::ChainStatus;
use edgesim_sfc::core::vm::VmStatus;
use edgesim_sfc::extensions::workload::PoissonWorkload;
use edgesim_sfc::simulation::{SfcSimulation, StrategyKind};

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn make_sim() -> SfcSimulation {
    SfcSimulation::new(Simulation::new(123), SimulationConfig::default())
}

fn small_demand() -> ResourceDemand {
    ResourceDemand::new(1, 1000., 4096, 100, 1024)
}

#[test]
// Destroying a running chain with three placed VMs empties every involved
// host and removes the chain from the active registry.
fn test_destroy_releases_everything() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(dc1, "h1", 2, 1000., 8192, 10000, 65536);
    sim.add_host(dc1, "h2", 2, 1000., 8192, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Streaming,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand(), small_demand(), small_demand()],
        1000.,
        0.,
    );
    sim.step_for_duration(20.);

    let controller = sim.controller(chain_id);
    assert_eq!(controller.borrow().status(), ChainStatus::Running);
    assert!(sim.registry().borrow().contains(chain_id));
    let site = sim.site(dc1);
    let hosted: usize = (0..site.borrow().host_count()).map(|h| site.borrow().pool(h as u32).vm_count()).sum();
    assert_eq!(hosted, 3);

    sim.destroy_chain(chain_id, 0.);
    sim.step_for_duration(20.);

    assert_eq!(controller.borrow().status(), ChainStatus::Terminated);
    assert_eq!(sim.registry().borrow().active_count(), 0);
    for h in 0..site.borrow().host_count() {
        assert_eq!(site.borrow().pool(h as u32).vm_count(), 0);
    }
    for vm in controller.borrow().chain().vms() {
        assert_eq!(vm.status(), VmStatus::Terminated);
        assert_eq!(vm.site(), None);
    }
    assert_eq!(sim.broker().borrow().destroyed(), &[chain_id]);
    assert!(sim.broker().borrow().failed().is_empty());
}

#[test]
// The lifetime deadline tears the chain down without an explicit request.
fn test_lifetime_expiry() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(dc1, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);

    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand()],
        10.,
        0.,
    );
    sim.step_for_duration(8.);
    assert_eq!(sim.controller(chain_id).borrow().status(), ChainStatus::Running);

    sim.step_for_duration(20.);
    assert_eq!(sim.controller(chain_id).borrow().status(), ChainStatus::Terminated);
    assert_eq!(sim.registry().borrow().active_count(), 0);
    assert_eq!(sim.site(dc1).borrow().pool(0).vm_count(), 0);
}

#[test]
// An acknowledgement arriving after the lifetime deadline is dropped: the
// chain is already terminated and no assignment is recorded.
fn test_stale_ack_is_dropped() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(dc1, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 1);

    // The creation ack takes well over a second to come back, so a one
    // second lifetime expires while the ack is still in flight.
    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand()],
        1.,
        0.,
    );
    sim.step_for_duration(20.);

    let controller = sim.controller(chain_id);
    let controller = controller.borrow();
    assert_eq!(controller.status(), ChainStatus::Terminated);
    assert!(controller.chain().placed().is_empty());
    assert!(sim.broker().borrow().completed().is_empty());
    assert!(sim.broker().borrow().failed().is_empty());
    assert_eq!(sim.broker().borrow().destroyed(), &[chain_id]);
}

#[test]
// Builds the whole topology from the YAML config and places a chain on it.
fn test_config_driven_setup() {
    let sim_config = SimulationConfig::from_file(&name_wrapper("config.yaml"));
    assert_eq!(sim_config.migration_throughput, 2000.);
    assert_eq!(sim_config.sites.len(), 3);

    let mut sim = SfcSimulation::new(Simulation::new(123), sim_config);
    sim.build_from_config();
    let users = sim.lookup_id("users");
    let dc1 = sim.lookup_id("dc1");
    assert!(sim.site(users).borrow().is_user_hosting_only());
    assert_eq!(sim.site(dc1).borrow().host_count(), 2);

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
    // dc1 is the nearest placement site to the users in the config.
    for vm in controller.chain().vms() {
        assert_eq!(controller.chain().site_of(vm.id), Some(dc1));
    }
}

#[test]
// Poisson workload smoke run: every generated chain is eventually torn down
// and the run is fully driven by the seeded generator.
fn test_poisson_workload() {
    let mut sim = make_sim();
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    let dc2 = sim.add_site("dc2", false);
    sim.add_host(users, "u1", 4, 2000., 16384, 10000, 65536);
    for site in [dc1, dc2] {
        for h in 1..=4 {
            sim.add_host(site, &format!("h{}", h), 16, 2000., 65536, 10000, 262144);
        }
    }
    sim.add_link(users, dc1, 1.0, 1);
    sim.add_link(users, dc2, 2.0, 1);
    sim.add_link(dc1, dc2, 1.0, 1);

    let workload = PoissonWorkload::new(1.0, 50., StrategyKind::NearestRetry);
    let chains = workload.generate(&mut sim, &[users], 10);
    assert_eq!(chains.len(), 10);
    sim.step_for_duration(2000.);

    assert_eq!(sim.broker().borrow().destroyed().len(), 10);
    assert!(!sim.broker().borrow().completed().is_empty());
    assert_eq!(sim.registry().borrow().active_count(), 0);
}
