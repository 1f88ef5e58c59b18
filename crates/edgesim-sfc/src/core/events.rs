//! Standard simulation events.

// VM PLACEMENT EVENTS /////////////////////////////////////////////////////////////////////////////

pub mod placement {
    use serde::Serialize;

    use edgesim_core::Id;

    use crate::core::common::ResourceDemand;

    /// Request to create a VM on some host of the destination site.
    #[derive(Serialize)]
    pub struct VmCreateRequest {
        pub vm_id: u32,
        pub chain_id: u32,
        pub demand: ResourceDemand,
    }

    /// Acknowledgement of a VM creation request.
    #[derive(Serialize)]
    pub struct VmCreateAck {
        pub vm_id: u32,
        pub site_id: Id,
        pub host: Option<u32>,
        pub success: bool,
    }

    /// Request to destroy a VM hosted on the destination site.
    #[derive(Serialize)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
    }

    /// Acknowledgement of a VM destroy request.
    #[derive(Serialize)]
    pub struct VmDestroyAck {
        pub vm_id: u32,
        pub site_id: Id,
        pub success: bool,
    }

    /// Request to migrate a hosted VM to another host of the same site.
    #[derive(Serialize)]
    pub struct MigrationRequest {
        pub vm_id: u32,
        pub target_host: u32,
    }

    /// Internal site event fired when the VM state transfer is over.
    #[derive(Serialize)]
    pub struct MigrationFinished {
        pub vm_id: u32,
        pub source_host: u32,
        pub target_host: u32,
    }
}

// CHAIN LIFECYCLE EVENTS //////////////////////////////////////////////////////////////////////////

pub mod chain {
    use serde::Serialize;

    use edgesim_core::Id;

    use crate::core::common::ChainFailure;

    /// Starts the chain's placement state machine.
    #[derive(Serialize)]
    pub struct ServiceStart {}

    /// Explicit request to tear the chain down.
    #[derive(Serialize)]
    pub struct DestroyRequest {}

    /// Self-addressed event scheduled at the chain's lifetime deadline.
    #[derive(Serialize)]
    pub struct LifetimeExpired {}

    /// Completion notification sent to the chain's owner: every VM has been
    /// placed and the chain is running.
    #[derive(Serialize)]
    pub struct ChainCompleted {
        pub chain_id: u32,
        /// Final VM-to-site mapping in role order.
        pub assignment: Vec<(u32, Id)>,
    }

    /// Failure notification sent to the chain's owner.
    #[derive(Serialize)]
    pub struct ChainFailed {
        pub chain_id: u32,
        pub reason: ChainFailure,
    }

    /// Teardown notification sent to the chain's owner once every placed VM
    /// has been released.
    #[derive(Serialize)]
    pub struct ChainDestroyed {
        pub chain_id: u32,
    }
}

// MONITORING EVENTS ///////////////////////////////////////////////////////////////////////////////

pub mod monitoring {
    use serde::Serialize;

    use edgesim_core::Id;

    use crate::core::solver::SiteResources;

    /// Periodic self-addressed site event triggering host state reporting.
    #[derive(Serialize)]
    pub struct UtilizationProbe {}

    /// Host state snapshot sent from a site to monitoring.
    #[derive(Serialize)]
    pub struct HostStateUpdate {
        pub site_id: Id,
        pub host: u32,
        pub free_cpu_units: u32,
        pub free_cpu_rate: f64,
        pub free_ram: u64,
        pub free_bandwidth: u64,
        pub free_storage: u64,
        pub vm_count: u32,
    }

    /// Request for the current per-site free resource view.
    #[derive(Serialize)]
    pub struct ResourceViewRequest {}

    /// Reply to [`ResourceViewRequest`].
    #[derive(Serialize)]
    pub struct ResourceViewResponse {
        pub sites: Vec<SiteResources>,
        pub active_chains: u32,
    }
}
