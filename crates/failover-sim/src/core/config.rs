//! Simulation configuration.

use serde::{Deserialize, Serialize};

fn default_policy() -> String {
    "FirstFit".to_string()
}

/// Describes one tier: a group of identical hosts sharing a capacity profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// tier label, e.g. "frontend"
    pub name: String,
    /// number of hosts in the tier
    pub host_count: u32,
    /// id assigned to the first host; the rest follow sequentially
    #[serde(default)]
    pub first_host_id: u32,
    /// compute rate of each processing element
    pub mips_per_pe: u32,
    /// processing elements per host
    pub pes_per_host: u32,
    /// host memory capacity
    pub memory_per_host: u64,
    /// host bandwidth capacity
    pub bandwidth_per_host: u64,
    /// host storage capacity
    pub storage_per_host: u64,
}

/// A datacenter with its tiers of hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatacenterConfig {
    pub name: String,
    pub tiers: Vec<TierConfig>,
}

/// VM template: identity, target datacenter and resource demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmConfig {
    pub id: u32,
    pub datacenter: String,
    pub mips: u32,
    pub pe_count: u32,
    pub memory: u64,
    pub bandwidth: u64,
    pub storage: u64,
}

/// A scheduled host failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureConfig {
    pub datacenter: String,
    pub host_id: u32,
    pub at_time: f64,
}

/// Represents simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// placement policy used for initial placement and failover
    #[serde(default = "default_policy")]
    pub placement_policy: String,
    /// datacenters with their host tiers
    pub datacenters: Vec<DatacenterConfig>,
    /// virtual machines to place at startup
    #[serde(default)]
    pub vms: Vec<VmConfig>,
    /// host failure schedule
    #[serde(default)]
    pub failures: Vec<FailureConfig>,
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from a .yaml file.
    pub fn from_file(file_name: &str) -> Self {
        Self::parse(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
    }

    /// Parses config from a YAML string.
    pub fn parse(yaml: &str) -> Self {
        let config: SimulationConfig =
            serde_yaml::from_str(yaml).unwrap_or_else(|e| panic!("Can't parse YAML config: {}", e));
        config.validate();
        config
    }

    fn validate(&self) {
        for dc in &self.datacenters {
            for tier in &dc.tiers {
                if tier.host_count == 0 {
                    panic!("tier {} in {} must have host_count > 0", tier.name, dc.name);
                }
                if tier.pes_per_host == 0 {
                    panic!("tier {} in {} must have pes_per_host >= 1", tier.name, dc.name);
                }
                if tier.mips_per_pe == 0 {
                    panic!("tier {} in {} must have mips_per_pe > 0", tier.name, dc.name);
                }
                if tier.memory_per_host == 0 || tier.bandwidth_per_host == 0 || tier.storage_per_host == 0 {
                    panic!("tier {} in {} must have positive capacities", tier.name, dc.name);
                }
            }
        }
    }

    /// Returns total hosts count across all datacenters.
    pub fn number_of_hosts(&self) -> u32 {
        self.datacenters
            .iter()
            .flat_map(|dc| dc.tiers.iter())
            .map(|tier| tier.host_count)
            .sum()
    }
}
