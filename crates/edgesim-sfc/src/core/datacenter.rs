//! Event-driven site entity owning the resource pools of its hosts.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use edgesim_core::cast;
use edgesim_core::context::SimulationContext;
use edgesim_core::event::Event;
use edgesim_core::handler::EventHandler;
use edgesim_core::Id;
use edgesim_core::{log_debug, log_trace, log_warn};

use crate::core::common::AllocationDenied;
use crate::core::config::SimulationConfig;
use crate::core::events::monitoring::{HostStateUpdate, UtilizationProbe};
use crate::core::events::placement::{
    MigrationFinished, MigrationRequest, VmCreateAck, VmCreateRequest, VmDestroyAck, VmDestroyRequest,
};
use crate::core::records::RecordSink;
use crate::core::resource_pool::HostPool;

/// A named group of hosts; the unit of placement choice.
///
/// All resource state of a host is mutated only through its own pool,
/// synchronously from this entity's event handler. VM creation requests are
/// admitted host by host in first-fit order; denials are acknowledged back
/// to the requesting chain and never escalate further.
pub struct Datacenter {
    hosts: BTreeMap<u32, HostPool>,
    vm_locations: HashMap<u32, u32>,
    vm_owners: HashMap<u32, u32>,
    user_hosting_only: bool,
    monitoring_id: Id,
    sink: Rc<RefCell<dyn RecordSink>>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        user_hosting_only: bool,
        monitoring_id: Id,
        sink: Rc<RefCell<dyn RecordSink>>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            hosts: BTreeMap::new(),
            vm_locations: HashMap::new(),
            vm_owners: HashMap::new(),
            user_hosting_only,
            monitoring_id,
            sink,
            ctx,
            sim_config,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn is_user_hosting_only(&self) -> bool {
        self.user_hosting_only
    }

    pub fn add_host(&mut self, pool: HostPool) -> u32 {
        let host_id = self.hosts.len() as u32;
        self.hosts.insert(host_id, pool);
        host_id
    }

    pub fn pool(&self, host: u32) -> &HostPool {
        &self.hosts[&host]
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Host currently holding the VM, if it is placed on this site.
    pub fn host_of_vm(&self, vm_id: u32) -> Option<u32> {
        self.vm_locations.get(&vm_id).copied()
    }

    fn vm_readable_id(&self, host: u32, vm_id: u32) -> String {
        format!("{}.{}.v{}", self.ctx.name(), self.hosts[&host].name(), vm_id)
    }

    fn owner_readable_id(&self, vm_id: u32) -> String {
        self.vm_owners.get(&vm_id).map(|c| format!("c{}", c)).unwrap_or_default()
    }

    fn record_vm_request(&mut self, host: Option<u32>, vm_id: u32, reason: &str, status: bool) {
        if self.user_hosting_only {
            return;
        }
        let host_name = host.map(|h| self.hosts[&h].name().to_owned()).unwrap_or_default();
        let vm_name = host
            .map(|h| self.vm_readable_id(h, vm_id))
            .unwrap_or_else(|| format!("v{}", vm_id));
        let owner = self.owner_readable_id(vm_id);
        let site = self.ctx.name().to_owned();
        let result = self
            .sink
            .borrow_mut()
            .vm_request(self.ctx.time(), &host_name, &vm_name, &site, &owner, reason, status);
        if let Err(e) = result {
            log_warn!(self.ctx, "failed to write vm request record: {}", e);
        }
    }

    fn on_vm_create_request(&mut self, vm_id: u32, chain_id: u32, demand: crate::core::common::ResourceDemand, client: Id) {
        self.vm_owners.insert(vm_id, chain_id);
        if self.user_hosting_only {
            log_debug!(self.ctx, "rejected vm {}: site hosts user VMs only", vm_id);
            self.ctx.emit(
                VmCreateAck {
                    vm_id,
                    site_id: self.ctx.id(),
                    host: None,
                    success: false,
                },
                client,
                self.sim_config.message_delay,
            );
            return;
        }
        let mut last_denial = AllocationDenied::Cpu;
        let mut selected = None;
        for (&host_id, pool) in self.hosts.iter_mut() {
            match pool.allocate(vm_id, &demand) {
                Ok(()) => {
                    selected = Some(host_id);
                    break;
                }
                Err(denial) => last_denial = denial,
            }
        }
        match selected {
            Some(host_id) => {
                self.vm_locations.insert(vm_id, host_id);
                log_debug!(self.ctx, "vm {} allocated on host {}", vm_id, self.hosts[&host_id].name());
                self.record_vm_request(Some(host_id), vm_id, "success", true);
                self.ctx.emit(
                    VmCreateAck {
                        vm_id,
                        site_id: self.ctx.id(),
                        host: Some(host_id),
                        success: true,
                    },
                    client,
                    self.sim_config.vm_start_duration + self.sim_config.message_delay,
                );
            }
            None => {
                log_debug!(self.ctx, "not enough space for vm {}: {}", vm_id, last_denial);
                self.record_vm_request(None, vm_id, &last_denial.to_string(), false);
                self.ctx.emit(
                    VmCreateAck {
                        vm_id,
                        site_id: self.ctx.id(),
                        host: None,
                        success: false,
                    },
                    client,
                    self.sim_config.message_delay,
                );
            }
        }
    }

    fn on_vm_destroy_request(&mut self, vm_id: u32, client: Id) {
        let success = match self.vm_locations.remove(&vm_id) {
            Some(host_id) => {
                self.hosts.get_mut(&host_id).unwrap().release(vm_id);
                log_debug!(self.ctx, "released vm {} from host {}", vm_id, self.hosts[&host_id].name());
                self.record_vm_request(Some(host_id), vm_id, "destroyed", true);
                true
            }
            None => {
                log_trace!(self.ctx, "vm {} is not hosted here, probably migrated away", vm_id);
                false
            }
        };
        let delay = if success {
            self.sim_config.vm_stop_duration + self.sim_config.message_delay
        } else {
            self.sim_config.message_delay
        };
        self.ctx.emit(
            VmDestroyAck {
                vm_id,
                site_id: self.ctx.id(),
                success,
            },
            client,
            delay,
        );
    }

    /// Starts relocating a hosted VM to another host of this site.
    ///
    /// The target host books the VM's whole claim up front, so during the
    /// transfer the claim is counted twice: once on the source and once on
    /// the target. A denial on the target is an ordinary result; the VM
    /// simply stays where it is.
    fn on_migration_request(&mut self, vm_id: u32, target_host: u32) {
        let Some(source_host) = self.vm_locations.get(&vm_id).copied() else {
            log_warn!(self.ctx, "cannot migrate vm {}: not hosted on this site", vm_id);
            return;
        };
        if source_host == target_host || !self.hosts.contains_key(&target_host) {
            log_warn!(self.ctx, "cannot migrate vm {}: invalid target host {}", vm_id, target_host);
            return;
        }
        let demand = match self.hosts[&source_host].vm_demand(vm_id) {
            Some(demand) => demand.clone(),
            None => return,
        };
        match self.hosts.get_mut(&target_host).unwrap().begin_migration_in(vm_id, &demand) {
            Ok(()) => {
                let duration = demand.ram as f64 / self.sim_config.migration_throughput;
                log_debug!(
                    self.ctx,
                    "vm {} migration {} -> {} started, transfer takes {:.3}",
                    vm_id,
                    self.hosts[&source_host].name(),
                    self.hosts[&target_host].name(),
                    duration
                );
                self.ctx.emit_self(
                    MigrationFinished {
                        vm_id,
                        source_host,
                        target_host,
                    },
                    duration,
                );
            }
            Err(denial) => {
                log_debug!(self.ctx, "vm {} migration to host {} denied: {}", vm_id, target_host, denial);
                self.record_vm_request(Some(target_host), vm_id, &denial.to_string(), false);
            }
        }
    }

    fn on_migration_finished(&mut self, vm_id: u32, source_host: u32, target_host: u32) {
        if !self.hosts[&source_host].contains_vm(vm_id) {
            // VM was destroyed mid-transfer, unwind the booking on the target.
            self.hosts.get_mut(&target_host).unwrap().cancel_migration_in(vm_id);
            log_debug!(self.ctx, "vm {} migration canceled, VM is gone", vm_id);
            return;
        }
        self.hosts.get_mut(&source_host).unwrap().release(vm_id);
        self.hosts.get_mut(&target_host).unwrap().complete_migration_in(vm_id);
        self.vm_locations.insert(vm_id, target_host);
        log_debug!(
            self.ctx,
            "vm {} migration {} -> {} finished",
            vm_id,
            self.hosts[&source_host].name(),
            self.hosts[&target_host].name()
        );
    }

    fn send_host_states(&mut self) {
        for (&host_id, pool) in &self.hosts {
            let snapshot = self.sink.borrow_mut().host_snapshot(
                self.ctx.time(),
                pool.name(),
                self.ctx.name(),
                pool.available_ram(),
                pool.free_units(),
                pool.total_cpu_rate(),
                pool.available_bandwidth(),
                pool.available_storage(),
                pool.vm_count() as u32,
            );
            if let Err(e) = snapshot {
                log_warn!(self.ctx, "failed to write host snapshot record: {}", e);
            }
            self.ctx.emit(
                HostStateUpdate {
                    site_id: self.ctx.id(),
                    host: host_id,
                    free_cpu_units: pool.free_units(),
                    free_cpu_rate: pool.available_cpu_rate(),
                    free_ram: pool.available_ram(),
                    free_bandwidth: pool.available_bandwidth(),
                    free_storage: pool.available_storage(),
                    vm_count: pool.vm_count() as u32,
                },
                self.monitoring_id,
                self.sim_config.message_delay,
            );
        }
        self.ctx.emit_self(UtilizationProbe {}, self.sim_config.send_stats_period);
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { vm_id, chain_id, demand } => {
                self.on_vm_create_request(vm_id, chain_id, demand, src);
            }
            VmDestroyRequest { vm_id } => {
                self.on_vm_destroy_request(vm_id, src);
            }
            MigrationRequest { vm_id, target_host } => {
                self.on_migration_request(vm_id, target_host);
            }
            MigrationFinished {
                vm_id,
                source_host,
                target_host,
            } => {
                self.on_migration_finished(vm_id, source_host, target_host);
            }
            UtilizationProbe {} => {
                self.send_host_states();
            }
        })
    }
}
