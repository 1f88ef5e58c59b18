//! Simulation configuration.

use serde::{Deserialize, Serialize};

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
struct RawSimulationConfig {
    pub message_delay: Option<f64>,
    pub vm_start_duration: Option<f64>,
    pub vm_stop_duration: Option<f64>,
    pub send_stats_period: Option<f64>,
    pub migration_throughput: Option<f64>,
    pub sites: Option<Vec<SiteConfig>>,
    pub links: Option<Vec<LinkConfig>>,
}

/// Holds configuration of a single host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name prefix.
    /// Full name is produced by appending the host instance number to the prefix.
    pub name_prefix: Option<String>,
    /// Number of CPU units.
    pub cpu_units: u32,
    /// Rate (MIPS) of a single CPU unit.
    pub cpu_rate: f64,
    /// Memory capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity in Mbit/s.
    pub bandwidth: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Holds configuration of a single site (datacenter).
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SiteConfig {
    /// Site name.
    pub name: String,
    /// Whether the site is reserved for hosting user-anchor VMs only.
    pub user_hosting_only: Option<bool>,
    /// Configurations of the site's hosts.
    pub hosts: Vec<HostConfig>,
}

/// Holds configuration of a network link between two sites.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
    /// Network delay in seconds.
    pub delay: f64,
    /// Number of network hops.
    pub hops: Option<u32>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Message delay in seconds for communications via network.
    pub message_delay: f64,
    /// VM start duration in seconds.
    pub vm_start_duration: f64,
    /// VM stop duration in seconds.
    pub vm_stop_duration: f64,
    /// Period length in seconds for sending host statistics to monitoring.
    pub send_stats_period: f64,
    /// Migration throughput in MB/s.
    /// Used to compute VM migration duration from the VM's RAM size.
    pub migration_throughput: f64,
    /// Configurations of sites.
    pub sites: Vec<SiteConfig>,
    /// Configurations of network links between sites.
    pub links: Vec<LinkConfig>,
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        let raw: RawSimulationConfig = serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name));
        Self::from_raw(raw)
    }

    /// Creates simulation config from a YAML string.
    pub fn from_str(content: &str) -> Self {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(content).unwrap_or_else(|_| panic!("Can't parse YAML config"));
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            message_delay: raw.message_delay.unwrap_or(0.2),
            vm_start_duration: raw.vm_start_duration.unwrap_or(1.),
            vm_stop_duration: raw.vm_stop_duration.unwrap_or(0.5),
            send_stats_period: raw.send_stats_period.unwrap_or(0.5),
            migration_throughput: raw.migration_throughput.unwrap_or(1000.),
            sites: raw.sites.unwrap_or_default(),
            links: raw.links.unwrap_or_default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}
