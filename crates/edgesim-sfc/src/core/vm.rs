//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use edgesim_core::Id;

use crate::core::common::{ReadableId, ResourceDemand};

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Instantiating,
    Running,
    Migrating,
    Terminated,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Instantiating => write!(f, "instantiating"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Migrating => write!(f, "migrating"),
            VmStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// A placed or pending unit of virtual compute capacity.
#[derive(Clone, Debug)]
pub struct VirtualMachine {
    pub id: u32,
    pub demand: ResourceDemand,
    status: VmStatus,
    in_migration: bool,
    site: Option<Id>,
}

impl VirtualMachine {
    pub fn new(id: u32, demand: ResourceDemand) -> Self {
        Self {
            id,
            demand,
            status: VmStatus::Instantiating,
            in_migration: false,
            site: None,
        }
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }

    pub fn in_migration(&self) -> bool {
        self.in_migration
    }

    pub fn set_in_migration(&mut self, in_migration: bool) {
        self.in_migration = in_migration;
    }

    /// Site currently hosting the VM, `None` while unplaced.
    pub fn site(&self) -> Option<Id> {
        self.site
    }

    pub fn set_site(&mut self, site: Option<Id>) {
        self.site = site;
    }
}

impl ReadableId for VirtualMachine {
    fn readable_id(&self) -> String {
        format!("v{}", self.id)
    }
}
