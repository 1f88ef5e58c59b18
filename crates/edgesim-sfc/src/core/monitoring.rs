//! Service that provides information about current state of sites and hosts.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use edgesim_core::cast;
use edgesim_core::context::SimulationContext;
use edgesim_core::event::Event;
use edgesim_core::handler::EventHandler;
use edgesim_core::Id;

use crate::core::config::SimulationConfig;
use crate::core::events::monitoring::{HostStateUpdate, ResourceViewRequest, ResourceViewResponse};
use crate::core::logger::Logger;
use crate::core::registry::ChainRegistry;
use crate::core::solver::{ResourceView, SiteResources};

/// Host state as last reported by its site.
#[derive(Clone)]
pub struct HostState {
    pub free_cpu_units: u32,
    pub free_cpu_rate: f64,
    pub free_ram: u64,
    pub free_bandwidth: u64,
    pub free_storage: u64,
    pub vm_count: u32,
}

struct SiteState {
    user_hosting_only: bool,
    hosts: BTreeMap<u32, HostState>,
}

/// Stores the information about current host states received from the sites
/// and serves the per-site free resource view consumed by the chain
/// controllers and the solver boundary. Just like in a real system, the
/// information arrives with some delay, so it can be outdated.
pub struct Monitoring {
    sites: BTreeMap<Id, SiteState>,
    registry: Rc<RefCell<ChainRegistry>>,
    ctx: SimulationContext,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    sim_config: Rc<SimulationConfig>,
}

impl Monitoring {
    pub fn new(
        registry: Rc<RefCell<ChainRegistry>>,
        ctx: SimulationContext,
        logger: Rc<RefCell<Box<dyn Logger>>>,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            sites: BTreeMap::new(),
            registry,
            ctx,
            logger,
            sim_config,
        }
    }

    /// Returns component id.
    pub fn get_id(&self) -> Id {
        self.ctx.id()
    }

    pub fn add_site(&mut self, site_id: Id, user_hosting_only: bool) {
        self.sites.insert(
            site_id,
            SiteState {
                user_hosting_only,
                hosts: BTreeMap::new(),
            },
        );
    }

    /// Registers a host with its full capacity as the initial state.
    pub fn add_host(
        &mut self,
        site_id: Id,
        host: u32,
        cpu_units: u32,
        cpu_rate: f64,
        ram: u64,
        bandwidth: u64,
        storage: u64,
    ) {
        if let Some(site) = self.sites.get_mut(&site_id) {
            site.hosts.insert(
                host,
                HostState {
                    free_cpu_units: cpu_units,
                    free_cpu_rate: cpu_units as f64 * cpu_rate,
                    free_ram: ram,
                    free_bandwidth: bandwidth,
                    free_storage: storage,
                    vm_count: 0,
                },
            );
        }
    }

    pub fn host_state(&self, site_id: Id, host: u32) -> Option<&HostState> {
        self.sites.get(&site_id).and_then(|site| site.hosts.get(&host))
    }

    /// Per-site free resources aggregated over hosts, user-hosting sites
    /// excluded. This is the snapshot packaged into placement requests.
    pub fn resource_view(&self) -> ResourceView {
        self.sites
            .iter()
            .filter(|(_, site)| !site.user_hosting_only)
            .map(|(&id, site)| SiteResources {
                site: id,
                free_cpu_rate: site.hosts.values().map(|h| h.free_cpu_rate).sum(),
                free_ram: site.hosts.values().map(|h| h.free_ram).sum(),
            })
            .collect()
    }

    fn update_host_state(&mut self, update: HostStateUpdate) {
        self.logger.borrow_mut().log_trace(
            &self.ctx,
            format!("received stats for host {}.{}", update.site_id, update.host),
        );
        if let Some(site) = self.sites.get_mut(&update.site_id) {
            site.hosts.insert(
                update.host,
                HostState {
                    free_cpu_units: update.free_cpu_units,
                    free_cpu_rate: update.free_cpu_rate,
                    free_ram: update.free_ram,
                    free_bandwidth: update.free_bandwidth,
                    free_storage: update.free_storage,
                    vm_count: update.vm_count,
                },
            );
        }
    }

    fn on_resource_view_request(&mut self, client: Id) {
        let response = ResourceViewResponse {
            sites: self.resource_view(),
            active_chains: self.registry.borrow().active_count() as u32,
        };
        self.ctx.emit(response, client, self.sim_config.message_delay);
    }
}

impl EventHandler for Monitoring {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            HostStateUpdate {
                site_id,
                host,
                free_cpu_units,
                free_cpu_rate,
                free_ram,
                free_bandwidth,
                free_storage,
                vm_count,
            } => {
                self.update_host_state(HostStateUpdate {
                    site_id,
                    host,
                    free_cpu_units,
                    free_cpu_rate,
                    free_ram,
                    free_bandwidth,
                    free_storage,
                    vm_count,
                });
            }
            ResourceViewRequest {} => {
                self.on_resource_view_request(src);
            }
        })
    }
}
