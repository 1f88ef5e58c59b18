use std::fs;

use log::Level;
use sugars::{rc, refcell};

use edgesim_core::simulation::Simulation;

use edgesim_sfc::core::chain::ChainKind;
use edgesim_sfc::core::common::ResourceDemand;
use edgesim_sfc::core::config::SimulationConfig;
use edgesim_sfc::core::logger::FileLogger;
use edgesim_sfc::core::records::TsvSink;
use edgesim_sfc::core::service::ChainStatus;
use edgesim_sfc::simulation::{SfcSimulation, StrategyKind};

fn small_demand() -> ResourceDemand {
    ResourceDemand::new(1, 1000., 4096, 100, 1024)
}

fn run_one_chain(mut sim: SfcSimulation) -> SfcSimulation {
    let users = sim.add_site("users", true);
    let dc1 = sim.add_site("dc1", false);
    sim.add_host(users, "u1", 2, 1000., 4096, 1000, 16384);
    sim.add_host(dc1, "h1", 8, 2000., 16384, 10000, 65536);
    sim.add_link(users, dc1, 1.0, 2);
    let chain_id = sim.deploy_chain(
        ChainKind::Web,
        StrategyKind::NearestRetry,
        users,
        vec![small_demand(), small_demand()],
        100.,
        0.,
    );
    sim.step_for_duration(20.);
    assert_eq!(sim.controller(chain_id).borrow().status(), ChainStatus::Running);
    sim
}

#[test]
// All three record streams receive lines during an ordinary run.
fn test_tsv_record_streams() {
    let dir = std::env::temp_dir().join("edgesim-test-records");
    fs::create_dir_all(&dir).unwrap();
    let sink = rc!(refcell!(TsvSink::create(&dir).unwrap()));
    let sim = SfcSimulation::with_record_sink(Simulation::new(123), SimulationConfig::default(), sink);
    run_one_chain(sim);

    let requests = fs::read_to_string(dir.join("vm_requests.tsv")).unwrap();
    assert!(requests.contains("success"));
    assert!(requests.contains("c1"));
    let chains = fs::read_to_string(dir.join("chains.tsv")).unwrap();
    assert!(chains.contains("web"));
    assert!(chains.contains("users->dc1->dc1"));
    // Two links of the path crossed once each, 2 hops and then 0 for
    // co-located VMs.
    assert!(chains.contains("\t2"));
    let servers = fs::read_to_string(dir.join("servers.tsv")).unwrap();
    assert!(servers.contains("h1"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
// The in-memory logger collects entries and saves them as JSON lines.
fn test_file_logger() {
    let path = std::env::temp_dir().join("edgesim-test-log.json");
    let sim = SfcSimulation::with_logger(
        Simulation::new(123),
        SimulationConfig::default(),
        Box::new(FileLogger::with_level(Level::Trace)),
    );
    let sim = run_one_chain(sim);
    sim.save_log(path.to_str().unwrap()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("received stats"));
    assert!(content.contains("monitoring"));
    fs::remove_file(&path).unwrap();
}
