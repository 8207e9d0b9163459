//! Per-host resource accounting.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::common::{FitVerdict, ResourceDemand};

/// Stores host capacity and state (available resources, current allocations).
///
/// CPU capacity is compute-rate-weighted: a host with `pe_count` processing
/// elements of `mips_per_pe` each has `pe_count * mips_per_pe` total CPU.
/// Initial placement may overcommit resources (the excess is tracked
/// separately), while failover commits are always preceded by a strict
/// [`fits`](HostResources::fits) check.
#[derive(Clone, Debug, Serialize)]
pub struct HostResources {
    pub pe_count: u32,
    pub mips_per_pe: u32,

    pub cpu_total: u64,
    pub memory_total: u64,
    pub bandwidth_total: u64,
    pub storage_total: u64,

    pub cpu_available: u64,
    pub memory_available: u64,
    pub bandwidth_available: u64,
    pub storage_available: u64,

    cpu_overcommit: u64,
    memory_overcommit: u64,
    bandwidth_overcommit: u64,
    storage_overcommit: u64,

    allocations: BTreeMap<u32, ResourceDemand>,
}

impl HostResources {
    /// Creates an empty ledger with the specified host capacity.
    pub fn new(pe_count: u32, mips_per_pe: u32, memory: u64, bandwidth: u64, storage: u64) -> Self {
        let cpu_total = pe_count as u64 * mips_per_pe as u64;
        Self {
            pe_count,
            mips_per_pe,
            cpu_total,
            memory_total: memory,
            bandwidth_total: bandwidth,
            storage_total: storage,
            cpu_available: cpu_total,
            memory_available: memory,
            bandwidth_available: bandwidth,
            storage_available: storage,
            cpu_overcommit: 0,
            memory_overcommit: 0,
            bandwidth_overcommit: 0,
            storage_overcommit: 0,
            allocations: BTreeMap::new(),
        }
    }

    /// Checks whether the demand fits into currently available resources.
    /// All dimensions must pass; partial fits are infeasible.
    pub fn fits(&self, demand: &ResourceDemand) -> FitVerdict {
        if self.cpu_available < demand.cpu_weighted() {
            return FitVerdict::NotEnoughCpu;
        }
        if self.memory_available < demand.memory {
            return FitVerdict::NotEnoughMemory;
        }
        if self.bandwidth_available < demand.bandwidth {
            return FitVerdict::NotEnoughBandwidth;
        }
        if self.storage_available < demand.storage {
            return FitVerdict::NotEnoughStorage;
        }
        FitVerdict::Success
    }

    /// Records the demand against this host. Resources beyond capacity are
    /// accounted as overcommit. Repeated allocation of the same VM is a no-op.
    pub fn allocate(&mut self, vm_id: u32, demand: &ResourceDemand) {
        if self.allocations.contains_key(&vm_id) {
            return;
        }
        let cpu = demand.cpu_weighted();
        if self.cpu_available < cpu {
            self.cpu_overcommit += cpu - self.cpu_available;
            self.cpu_available = 0;
        } else {
            self.cpu_available -= cpu;
        }
        if self.memory_available < demand.memory {
            self.memory_overcommit += demand.memory - self.memory_available;
            self.memory_available = 0;
        } else {
            self.memory_available -= demand.memory;
        }
        if self.bandwidth_available < demand.bandwidth {
            self.bandwidth_overcommit += demand.bandwidth - self.bandwidth_available;
            self.bandwidth_available = 0;
        } else {
            self.bandwidth_available -= demand.bandwidth;
        }
        if self.storage_available < demand.storage {
            self.storage_overcommit += demand.storage - self.storage_available;
            self.storage_available = 0;
        } else {
            self.storage_available -= demand.storage;
        }
        self.allocations.insert(vm_id, demand.clone());
    }

    /// Removes the VM's demand from this host. No-op if the VM is absent.
    pub fn release(&mut self, vm_id: u32) {
        let demand = match self.allocations.remove(&vm_id) {
            Some(demand) => demand,
            None => return,
        };
        let cpu = demand.cpu_weighted();
        if self.cpu_overcommit >= cpu {
            self.cpu_overcommit -= cpu;
        } else {
            self.cpu_available += cpu - self.cpu_overcommit;
            self.cpu_overcommit = 0;
        }
        if self.memory_overcommit >= demand.memory {
            self.memory_overcommit -= demand.memory;
        } else {
            self.memory_available += demand.memory - self.memory_overcommit;
            self.memory_overcommit = 0;
        }
        if self.bandwidth_overcommit >= demand.bandwidth {
            self.bandwidth_overcommit -= demand.bandwidth;
        } else {
            self.bandwidth_available += demand.bandwidth - self.bandwidth_overcommit;
            self.bandwidth_overcommit = 0;
        }
        if self.storage_overcommit >= demand.storage {
            self.storage_overcommit -= demand.storage;
        } else {
            self.storage_available += demand.storage - self.storage_overcommit;
            self.storage_overcommit = 0;
        }
    }

    /// Returns the demand reserved for the specified VM, if any.
    pub fn allocation(&self, vm_id: u32) -> Option<&ResourceDemand> {
        self.allocations.get(&vm_id)
    }

    /// Returns current allocations as (vm id, demand) pairs.
    pub fn allocations(&self) -> &BTreeMap<u32, ResourceDemand> {
        &self.allocations
    }

    pub fn overcommitted(&self) -> bool {
        self.cpu_overcommit > 0
            || self.memory_overcommit > 0
            || self.bandwidth_overcommit > 0
            || self.storage_overcommit > 0
    }

    /// Checks the internal accounting arithmetic, returns an error message
    /// describing the first broken dimension.
    pub fn audit(&self) -> std::result::Result<(), String> {
        let mut cpu = 0u64;
        let mut memory = 0u64;
        let mut bandwidth = 0u64;
        let mut storage = 0u64;
        for demand in self.allocations.values() {
            cpu += demand.cpu_weighted();
            memory += demand.memory;
            bandwidth += demand.bandwidth;
            storage += demand.storage;
        }
        let dims = [
            ("cpu", cpu, self.cpu_total, self.cpu_available, self.cpu_overcommit),
            ("memory", memory, self.memory_total, self.memory_available, self.memory_overcommit),
            (
                "bandwidth",
                bandwidth,
                self.bandwidth_total,
                self.bandwidth_available,
                self.bandwidth_overcommit,
            ),
            (
                "storage",
                storage,
                self.storage_total,
                self.storage_available,
                self.storage_overcommit,
            ),
        ];
        for (name, allocated, total, available, overcommit) in dims {
            if allocated + available != total + overcommit {
                return Err(format!(
                    "{} accounting mismatch: allocated {} + available {} != total {} + overcommit {}",
                    name, allocated, available, total, overcommit
                ));
            }
            if overcommit == 0 && allocated > total {
                return Err(format!("{} allocations {} exceed capacity {}", name, allocated, total));
            }
        }
        Ok(())
    }
}
