//! Top-level simulation facade.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use edgesim_core::cast;
use edgesim_core::context::SimulationContext;
use edgesim_core::event::Event;
use edgesim_core::handler::EventHandler;
use edgesim_core::log_info;
use edgesim_core::simulation::Simulation;
use edgesim_core::Id;

use crate::core::chain::{ChainKind, ServiceChain};
use crate::core::common::{ChainFailure, ResourceDemand};
use crate::core::config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::events::chain::{ChainCompleted, ChainDestroyed, ChainFailed, DestroyRequest, ServiceStart};
use crate::core::events::monitoring::UtilizationProbe;
use crate::core::events::placement::MigrationRequest;
use crate::core::logger::{Logger, StdoutLogger};
use crate::core::monitoring::Monitoring;
use crate::core::network_map::NetworkMap;
use crate::core::records::{NullSink, RecordSink};
use crate::core::registry::ChainRegistry;
use crate::core::resource_pool::HostPool;
use crate::core::service::ServiceController;
use crate::core::site_selector::DatacenterSelector;
use crate::core::solver::{GreedySolver, PlacementSolver};
use crate::core::strategies::chained_proximity::ChainedProximity;
use crate::core::strategies::external_solve::ExternalSolve;
use crate::core::strategies::nearest_retry::NearestRetry;
use crate::core::strategies::PlacementStrategy;

/// Placement strategy selection for a deployed chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    NearestRetry,
    ChainedProximity,
    ExternalSolve,
}

/// Owner of the deployed chains; collects their outcome notifications.
pub struct Broker {
    completed: Vec<(u32, Vec<(u32, Id)>)>,
    failed: Vec<(u32, ChainFailure)>,
    destroyed: Vec<u32>,
    ctx: SimulationContext,
}

impl Broker {
    fn new(ctx: SimulationContext) -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            destroyed: Vec::new(),
            ctx,
        }
    }

    /// Chains reported as fully placed, with their final VM-to-site mapping.
    pub fn completed(&self) -> &[(u32, Vec<(u32, Id)>)] {
        &self.completed
    }

    pub fn failed(&self) -> &[(u32, ChainFailure)] {
        &self.failed
    }

    pub fn destroyed(&self) -> &[u32] {
        &self.destroyed
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            ChainCompleted { chain_id, assignment } => {
                log_info!(self.ctx, "chain c{} deployed on {} sites", chain_id, assignment.len());
                self.completed.push((chain_id, assignment));
            }
            ChainFailed { chain_id, reason } => {
                log_info!(self.ctx, "chain c{} failed: {}", chain_id, reason);
                self.failed.push((chain_id, reason));
            }
            ChainDestroyed { chain_id } => {
                self.destroyed.push(chain_id);
            }
        })
    }
}

/// Represents a simulation of service chain placement, provides methods for
/// its configuration and execution.
///
/// Wires together the sites, monitoring, chain controllers, registry and the
/// broker on top of the event-driven kernel. All cross-component links are
/// explicit values created here; there are no process-wide singletons.
pub struct SfcSimulation {
    monitoring: Rc<RefCell<Monitoring>>,
    monitoring_id: Id,
    broker: Rc<RefCell<Broker>>,
    broker_id: Id,
    sites: HashMap<Id, Rc<RefCell<Datacenter>>>,
    controllers: HashMap<u32, Rc<RefCell<ServiceController>>>,
    network: Rc<RefCell<NetworkMap>>,
    selector: Rc<RefCell<DatacenterSelector>>,
    registry: Rc<RefCell<ChainRegistry>>,
    solver: Rc<RefCell<Box<dyn PlacementSolver>>>,
    sink: Rc<RefCell<dyn RecordSink>>,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    chain_counter: u32,
    vm_counter: u32,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl SfcSimulation {
    /// Creates a simulation with a dropped record stream.
    pub fn new(sim: Simulation, sim_config: SimulationConfig) -> Self {
        Self::build(sim, sim_config, rc!(refcell!(NullSink::new())), Box::new(StdoutLogger::new()))
    }

    /// Creates a simulation with the custom logger implementation.
    pub fn with_logger(sim: Simulation, sim_config: SimulationConfig, logger: Box<dyn Logger>) -> Self {
        Self::build(sim, sim_config, rc!(refcell!(NullSink::new())), logger)
    }

    /// Creates a simulation writing observable records into the given sink.
    pub fn with_record_sink(sim: Simulation, sim_config: SimulationConfig, sink: Rc<RefCell<dyn RecordSink>>) -> Self {
        Self::build(sim, sim_config, sink, Box::new(StdoutLogger::new()))
    }

    fn build(
        mut sim: Simulation,
        sim_config: SimulationConfig,
        sink: Rc<RefCell<dyn RecordSink>>,
        logger: Box<dyn Logger>,
    ) -> Self {
        let sim_config = Rc::new(sim_config);
        let registry = rc!(refcell!(ChainRegistry::new()));
        let network = rc!(refcell!(NetworkMap::new()));
        let selector = rc!(refcell!(DatacenterSelector::new(network.clone())));
        let logger: Rc<RefCell<Box<dyn Logger>>> = rc!(refcell!(logger));
        let monitoring = rc!(refcell!(Monitoring::new(
            registry.clone(),
            sim.create_context("monitoring"),
            logger.clone(),
            sim_config.clone(),
        )));
        let monitoring_id = sim.add_handler("monitoring", monitoring.clone());
        let broker = rc!(refcell!(Broker::new(sim.create_context("broker"))));
        let broker_id = sim.add_handler("broker", broker.clone());
        let ctx = sim.create_context("simulation");
        Self {
            monitoring,
            monitoring_id,
            broker,
            broker_id,
            sites: HashMap::new(),
            controllers: HashMap::new(),
            network,
            selector,
            registry,
            solver: rc!(refcell!(Box::new(GreedySolver::new()) as Box<dyn PlacementSolver>)),
            sink,
            logger,
            chain_counter: 0,
            vm_counter: 0,
            sim,
            ctx,
            sim_config,
        }
    }

    /// Replaces the default greedy solver behind the solver boundary.
    pub fn set_solver(&mut self, solver: Box<dyn PlacementSolver>) {
        *self.solver.borrow_mut() = solver;
    }

    /// Creates a new site and returns its id. The site starts reporting host
    /// states to monitoring right away.
    pub fn add_site(&mut self, name: &str, user_hosting_only: bool) -> Id {
        let datacenter = rc!(refcell!(Datacenter::new(
            user_hosting_only,
            self.monitoring_id,
            self.sink.clone(),
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.sites.insert(id, datacenter);
        self.selector.borrow_mut().add_site(id, user_hosting_only);
        self.monitoring.borrow_mut().add_site(id, user_hosting_only);
        self.ctx.emit_now(UtilizationProbe {}, id);
        id
    }

    /// Creates a new host on the site and returns its id within the site.
    pub fn add_host(
        &mut self,
        site_id: Id,
        name: &str,
        cpu_units: u32,
        cpu_rate: f64,
        ram: u64,
        bandwidth: u64,
        storage: u64,
    ) -> u32 {
        let host = self.sites[&site_id]
            .borrow_mut()
            .add_host(HostPool::new(name, cpu_units, cpu_rate, ram, bandwidth, storage));
        self.monitoring
            .borrow_mut()
            .add_host(site_id, host, cpu_units, cpu_rate, ram, bandwidth, storage);
        host
    }

    /// Registers a symmetric network link between two sites.
    pub fn add_link(&mut self, a: Id, b: Id, delay: f64, hops: u32) {
        self.network.borrow_mut().add_link(a, b, delay, hops);
    }

    /// Creates sites, hosts and links from the configuration.
    pub fn build_from_config(&mut self) {
        let config = self.sim_config.clone();
        for site in &config.sites {
            let site_id = self.add_site(&site.name, site.user_hosting_only.unwrap_or(false));
            for host in &site.hosts {
                let prefix = host.name_prefix.clone().unwrap_or_else(|| "host".to_string());
                for i in 0..host.count.unwrap_or(1) {
                    self.add_host(
                        site_id,
                        &format!("{}{}", prefix, i + 1),
                        host.cpu_units,
                        host.cpu_rate,
                        host.ram,
                        host.bandwidth,
                        host.storage,
                    );
                }
            }
        }
        for link in &config.links {
            let from = self.sim.lookup_id(&link.from);
            let to = self.sim.lookup_id(&link.to);
            self.add_link(from, to, link.delay, link.hops.unwrap_or(1));
        }
    }

    fn make_strategy(&self, kind: StrategyKind) -> Box<dyn PlacementStrategy> {
        match kind {
            StrategyKind::NearestRetry => Box::new(NearestRetry::new(self.selector.clone())),
            StrategyKind::ChainedProximity => Box::new(ChainedProximity::new(self.selector.clone())),
            StrategyKind::ExternalSolve => Box::new(ExternalSolve::new(self.solver.clone())),
        }
    }

    /// Deploys a service chain anchored at the given site and returns the
    /// chain id. Placement starts after the specified delay and the chain is
    /// torn down automatically once its lifetime passes.
    pub fn deploy_chain(
        &mut self,
        kind: ChainKind,
        strategy: StrategyKind,
        anchor_site: Id,
        demands: Vec<ResourceDemand>,
        lifetime: f64,
        delay: f64,
    ) -> u32 {
        self.chain_counter += 1;
        let chain_id = self.chain_counter;
        let first_vm_id = self.vm_counter + 1;
        self.vm_counter += demands.len() as u32;
        let chain = ServiceChain::new(chain_id, kind, anchor_site, demands, first_vm_id);
        let name = format!("c{}", chain_id);
        let controller = rc!(refcell!(ServiceController::new(
            chain,
            self.make_strategy(strategy),
            self.broker_id,
            self.monitoring_id,
            lifetime,
            self.registry.clone(),
            self.network.clone(),
            self.sink.clone(),
            self.sim.create_context(&name),
            self.sim_config.clone(),
        )));
        let controller_id = self.sim.add_handler(&name, controller.clone());
        self.controllers.insert(chain_id, controller);
        self.ctx.emit(ServiceStart {}, controller_id, delay);
        chain_id
    }

    /// Requests teardown of a deployed chain.
    pub fn destroy_chain(&mut self, chain_id: u32, delay: f64) {
        if let Some(controller) = self.controllers.get(&chain_id) {
            let dst = controller.borrow().id();
            self.ctx.emit(DestroyRequest {}, dst, delay);
        }
    }

    /// Requests migration of a VM to another host of the same site.
    pub fn migrate_vm(&mut self, site_id: Id, vm_id: u32, target_host: u32) {
        self.ctx.emit_now(MigrationRequest { vm_id, target_host }, site_id);
    }

    /// Performs the specified number of steps through the simulation.
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    /// Steps through the simulation with duration limit.
    pub fn step_for_duration(&mut self, duration: f64) {
        self.sim.step_for_duration(duration);
    }

    /// Steps through the simulation until there are no pending events left.
    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events();
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.ctx.rand()
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: rand::prelude::Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.ctx.sample_from_distribution(dist)
    }

    /// Returns the identifier of component by its name.
    pub fn lookup_id(&self, name: &str) -> Id {
        self.sim.lookup_id(name)
    }

    pub fn site(&self, site_id: Id) -> Rc<RefCell<Datacenter>> {
        self.sites[&site_id].clone()
    }

    pub fn controller(&self, chain_id: u32) -> Rc<RefCell<ServiceController>> {
        self.controllers[&chain_id].clone()
    }

    pub fn broker(&self) -> Rc<RefCell<Broker>> {
        self.broker.clone()
    }

    pub fn registry(&self) -> Rc<RefCell<ChainRegistry>> {
        self.registry.clone()
    }

    pub fn monitoring(&self) -> Rc<RefCell<Monitoring>> {
        self.monitoring.clone()
    }

    pub fn network(&self) -> Rc<RefCell<NetworkMap>> {
        self.network.clone()
    }

    /// Saves the in-memory log if the configured logger collects one.
    pub fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        self.logger.borrow().save_log(path)
    }
}
