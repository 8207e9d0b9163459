//! Common types shared by the core components.

use serde::{Deserialize, Serialize};

/// Resource demand of a single VM in all accounted dimensions.
///
/// CPU demand is expressed as a required compute rate per processing
/// element and a required number of processing elements.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResourceDemand {
    pub mips_per_pe: u32,
    pub pe_count: u32,
    pub memory: u64,
    pub bandwidth: u64,
    pub storage: u64,
}

impl ResourceDemand {
    /// Compute-rate-weighted CPU demand (`rate x count`).
    pub fn cpu_weighted(&self) -> u64 {
        self.mips_per_pe as u64 * self.pe_count as u64
    }
}

/// Result of checking whether a host can accommodate a VM demand.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FitVerdict {
    Success,
    NotEnoughCpu,
    NotEnoughMemory,
    NotEnoughBandwidth,
    NotEnoughStorage,
    HostFailed,
}
