//! Per-chain placement and lifecycle state machine.

use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use serde::Serialize;

use edgesim_core::cast;
use edgesim_core::context::SimulationContext;
use edgesim_core::event::Event;
use edgesim_core::handler::EventHandler;
use edgesim_core::Id;
use edgesim_core::{log_debug, log_info, log_trace, log_warn};

use crate::core::chain::ServiceChain;
use crate::core::common::{ChainFailure, ReadableId};
use crate::core::config::SimulationConfig;
use crate::core::events::chain::{ChainCompleted, ChainDestroyed, ChainFailed, DestroyRequest, LifetimeExpired, ServiceStart};
use crate::core::events::monitoring::{ResourceViewRequest, ResourceViewResponse};
use crate::core::events::placement::{VmCreateAck, VmCreateRequest, VmDestroyAck, VmDestroyRequest};
use crate::core::network_map::NetworkMap;
use crate::core::records::RecordSink;
use crate::core::registry::ChainRegistry;
use crate::core::solver::ResourceView;
use crate::core::strategies::{PlacementStrategy, StrategyCommand};
use crate::core::vm::VmStatus;

/// Lifecycle status of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChainStatus {
    Idle,
    AwaitingResourceView,
    Placing,
    Running,
    Destroying,
    Terminated,
}

impl Display for ChainStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ChainStatus::Idle => write!(f, "idle"),
            ChainStatus::AwaitingResourceView => write!(f, "awaiting resource view"),
            ChainStatus::Placing => write!(f, "placing"),
            ChainStatus::Running => write!(f, "running"),
            ChainStatus::Destroying => write!(f, "destroying"),
            ChainStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// Drives one service chain from start to teardown.
///
/// The controller owns all event plumbing: it requests the resource view,
/// issues VM creation and destruction requests, applies the strategy's
/// decisions and notifies the owner about the outcome. Acknowledgements
/// arriving after the lifetime deadline or after `Terminated` are dropped.
pub struct ServiceController {
    chain: ServiceChain,
    status: ChainStatus,
    strategy: Box<dyn PlacementStrategy>,
    owner: Id,
    monitoring_id: Id,
    lifetime: f64,
    deadline: f64,
    failure: Option<ChainFailure>,
    pending_destroys: usize,
    registry: Rc<RefCell<ChainRegistry>>,
    network: Rc<RefCell<NetworkMap>>,
    sink: Rc<RefCell<dyn RecordSink>>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl ServiceController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: ServiceChain,
        strategy: Box<dyn PlacementStrategy>,
        owner: Id,
        monitoring_id: Id,
        lifetime: f64,
        registry: Rc<RefCell<ChainRegistry>>,
        network: Rc<RefCell<NetworkMap>>,
        sink: Rc<RefCell<dyn RecordSink>>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            chain,
            status: ChainStatus::Idle,
            strategy,
            owner,
            monitoring_id,
            lifetime,
            deadline: f64::INFINITY,
            failure: None,
            pending_destroys: 0,
            registry,
            network,
            sink,
            ctx,
            sim_config,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn status(&self) -> ChainStatus {
        self.status
    }

    pub fn chain(&self) -> &ServiceChain {
        &self.chain
    }

    pub fn failure(&self) -> Option<ChainFailure> {
        self.failure
    }

    fn on_start(&mut self) {
        if self.status != ChainStatus::Idle {
            log_warn!(self.ctx, "chain {} started twice", self.chain.readable_id());
            return;
        }
        self.deadline = self.ctx.time() + self.lifetime;
        self.ctx.emit_self(LifetimeExpired {}, self.lifetime);
        self.status = ChainStatus::AwaitingResourceView;
        self.ctx
            .emit(ResourceViewRequest {}, self.monitoring_id, self.sim_config.message_delay);
        log_debug!(
            self.ctx,
            "chain {} ({}) started, lifetime {:.1}",
            self.chain.readable_id(),
            self.chain.kind,
            self.lifetime
        );
    }

    fn on_resource_view(&mut self, view: ResourceView) {
        if self.status != ChainStatus::AwaitingResourceView {
            log_trace!(self.ctx, "dropped stale resource view");
            return;
        }
        self.status = ChainStatus::Placing;
        let command = self.strategy.begin(&self.chain, &view);
        self.apply(command);
    }

    fn apply(&mut self, command: StrategyCommand) {
        match command {
            StrategyCommand::Place(batch) => {
                for (vm_id, site) in batch {
                    self.chain.record_attempt(vm_id);
                    let demand = match self.chain.vm(vm_id) {
                        Some(vm) => vm.demand.clone(),
                        None => continue,
                    };
                    if let Some(vm) = self.chain.vm_mut(vm_id) {
                        vm.set_status(VmStatus::Instantiating);
                    }
                    log_debug!(
                        self.ctx,
                        "requesting vm {} of chain {} at site {}",
                        vm_id,
                        self.chain.readable_id(),
                        self.ctx.lookup_name(site)
                    );
                    self.ctx.emit(
                        VmCreateRequest {
                            vm_id,
                            chain_id: self.chain.id,
                            demand,
                        },
                        site,
                        self.sim_config.message_delay,
                    );
                }
            }
            StrategyCommand::Wait => {}
            StrategyCommand::Complete => self.complete(),
            StrategyCommand::Abort(failure) => self.abort(failure),
        }
    }

    fn on_vm_create_ack(&mut self, vm_id: u32, site: Id, success: bool) {
        match self.status {
            ChainStatus::Placing => {
                if success {
                    self.chain.assign(vm_id, site);
                    if let Some(vm) = self.chain.vm_mut(vm_id) {
                        vm.set_status(VmStatus::Running);
                    }
                    log_debug!(
                        self.ctx,
                        "vm {} of chain {} placed at site {}",
                        vm_id,
                        self.chain.readable_id(),
                        self.ctx.lookup_name(site)
                    );
                } else {
                    log_debug!(
                        self.ctx,
                        "vm {} of chain {} rejected by site {}",
                        vm_id,
                        self.chain.readable_id(),
                        self.ctx.lookup_name(site)
                    );
                }
                let command = self.strategy.on_ack(&self.chain, vm_id, site, success);
                self.apply(command);
            }
            ChainStatus::Destroying => {
                // Teardown started while this placement was in flight; the
                // VM must be released for the teardown to be complete.
                if success {
                    self.pending_destroys += 1;
                    self.ctx.emit(VmDestroyRequest { vm_id }, site, self.sim_config.message_delay);
                }
                log_trace!(self.ctx, "late creation ack for vm {} folded into teardown", vm_id);
            }
            _ => {
                log_trace!(self.ctx, "dropped stale creation ack for vm {}", vm_id);
            }
        }
    }

    fn on_vm_destroy_ack(&mut self, vm_id: u32) {
        if self.status != ChainStatus::Destroying {
            log_trace!(self.ctx, "dropped stale destroy ack for vm {}", vm_id);
            return;
        }
        if let Some(vm) = self.chain.vm_mut(vm_id) {
            vm.set_status(VmStatus::Terminated);
            vm.set_site(None);
        }
        self.pending_destroys = self.pending_destroys.saturating_sub(1);
        if self.pending_destroys == 0 {
            self.terminated();
        }
    }

    fn complete(&mut self) {
        self.status = ChainStatus::Running;
        self.registry
            .borrow_mut()
            .add(self.chain.id, self.chain.kind, self.owner);
        let path_names: Vec<String> = self
            .chain
            .site_path()
            .iter()
            .map(|&site| self.ctx.lookup_name(site))
            .collect();
        let hops = self.network.borrow().path_hop_count(&self.chain.site_path()) as i64;
        let summary = self.sink.borrow_mut().chain_summary(
            self.ctx.time(),
            &self.chain.readable_id(),
            &self.chain.kind.to_string(),
            &path_names.join("->"),
            hops,
        );
        if let Err(e) = summary {
            log_warn!(self.ctx, "failed to write chain summary record: {}", e);
        }
        log_info!(
            self.ctx,
            "chain {} is running: {} ({} hops)",
            self.chain.readable_id(),
            path_names.join(" -> "),
            hops
        );
        self.ctx.emit(
            ChainCompleted {
                chain_id: self.chain.id,
                assignment: self.chain.placed(),
            },
            self.owner,
            self.sim_config.message_delay,
        );
    }

    fn abort(&mut self, failure: ChainFailure) {
        self.failure = Some(failure);
        let summary = self.sink.borrow_mut().chain_summary(
            self.ctx.time(),
            &self.chain.readable_id(),
            &self.chain.kind.to_string(),
            "blocked",
            -1,
        );
        if let Err(e) = summary {
            log_warn!(self.ctx, "failed to write chain summary record: {}", e);
        }
        log_info!(self.ctx, "chain {} aborted: {}", self.chain.readable_id(), failure);
        self.begin_destroy();
    }

    fn begin_destroy(&mut self) {
        self.status = ChainStatus::Destroying;
        self.registry.borrow_mut().remove(self.chain.id);
        let placed = self.chain.placed();
        if placed.is_empty() {
            self.terminated();
            return;
        }
        self.pending_destroys = placed.len();
        for (vm_id, site) in placed {
            self.ctx.emit(VmDestroyRequest { vm_id }, site, self.sim_config.message_delay);
        }
        log_debug!(
            self.ctx,
            "chain {} is being destroyed, {} VMs to release",
            self.chain.readable_id(),
            self.pending_destroys
        );
    }

    fn terminated(&mut self) {
        self.status = ChainStatus::Terminated;
        self.registry.borrow_mut().remove(self.chain.id);
        if let Some(failure) = self.failure {
            self.ctx.emit(
                ChainFailed {
                    chain_id: self.chain.id,
                    reason: failure,
                },
                self.owner,
                self.sim_config.message_delay,
            );
        }
        self.ctx.emit(
            ChainDestroyed { chain_id: self.chain.id },
            self.owner,
            self.sim_config.message_delay,
        );
        log_info!(self.ctx, "chain {} terminated", self.chain.readable_id());
    }

    fn on_lifetime_expired(&mut self) {
        if matches!(self.status, ChainStatus::Destroying | ChainStatus::Terminated) {
            return;
        }
        log_debug!(self.ctx, "chain {} reached its lifetime", self.chain.readable_id());
        self.begin_destroy();
    }

    fn on_destroy_request(&mut self) {
        if matches!(self.status, ChainStatus::Destroying | ChainStatus::Terminated) {
            log_trace!(self.ctx, "dropped duplicate destroy request");
            return;
        }
        self.begin_destroy();
    }
}

impl EventHandler for ServiceController {
    fn on(&mut self, event: Event) {
        // The deadline is checked at the top of every handling step, so
        // anything delivered past it lands in teardown or stale handling.
        if self.ctx.time() > self.deadline && !matches!(self.status, ChainStatus::Destroying | ChainStatus::Terminated)
        {
            log_debug!(self.ctx, "chain {} outlived its deadline", self.chain.readable_id());
            self.begin_destroy();
        }
        cast!(match event.data {
            ServiceStart {} => {
                self.on_start();
            }
            ResourceViewResponse { sites, active_chains: _ } => {
                self.on_resource_view(sites);
            }
            VmCreateAck {
                vm_id,
                site_id,
                host: _,
                success,
            } => {
                self.on_vm_create_ack(vm_id, site_id, success);
            }
            VmDestroyAck {
                vm_id,
                site_id: _,
                success: _,
            } => {
                self.on_vm_destroy_ack(vm_id);
            }
            LifetimeExpired {} => {
                self.on_lifetime_expired();
            }
            DestroyRequest {} => {
                self.on_destroy_request();
            }
        })
    }
}
