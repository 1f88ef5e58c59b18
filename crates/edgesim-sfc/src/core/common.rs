//! Shared domain types.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Resource requirements of a single VM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceDemand {
    /// Number of CPU units claimed by the VM.
    pub cpu_units: u32,
    /// Rate (MIPS) requested per CPU unit.
    pub cpu_rate: f64,
    /// Memory in MB.
    pub ram: u64,
    /// Bandwidth in Mbit/s.
    pub bandwidth: u64,
    /// Disk size in MB.
    pub storage: u64,
}

impl ResourceDemand {
    pub fn new(cpu_units: u32, cpu_rate: f64, ram: u64, bandwidth: u64, storage: u64) -> Self {
        Self {
            cpu_units,
            cpu_rate,
            ram,
            bandwidth,
            storage,
        }
    }

    /// Total requested CPU rate over all units.
    pub fn total_cpu_rate(&self) -> f64 {
        self.cpu_units as f64 * self.cpu_rate
    }
}

/// Reason for denying a VM admission on a host.
///
/// Denials are ordinary results handled by the placement strategies,
/// they never terminate the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AllocationDenied {
    Storage,
    Ram,
    Bandwidth,
    Cpu,
}

impl Display for AllocationDenied {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AllocationDenied::Storage => write!(f, "failed by storage"),
            AllocationDenied::Ram => write!(f, "failed by RAM"),
            AllocationDenied::Bandwidth => write!(f, "failed by BW"),
            AllocationDenied::Cpu => write!(f, "failed by CPU"),
        }
    }
}

/// Reason for aborting a whole chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChainFailure {
    /// No untried candidate site remains for a pending VM.
    PlacementExhausted,
    /// The solver found no feasible placement for the chain.
    SolverNoSolution,
    /// A placement prescribed by the solver was rejected, so the solver
    /// state is considered outdated.
    PlacementStale,
}

impl Display for ChainFailure {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ChainFailure::PlacementExhausted => write!(f, "placement exhausted"),
            ChainFailure::SolverNoSolution => write!(f, "no solver solution"),
            ChainFailure::PlacementStale => write!(f, "stale solver placement"),
        }
    }
}

/// Capability of producing a human-friendly identifier for log and record
/// output. Readable ids are hierarchical (`site.host.vm`) and are never used
/// as identity.
pub trait ReadableId {
    fn readable_id(&self) -> String;
}
