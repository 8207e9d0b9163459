//! Datacenter/host/VM graph and its mutation primitives.
//!
//! All entities are owned by the registry and referenced by id (arena of
//! entities), which avoids mutable back-reference cycles between VMs and
//! hosts. The registry is built once at startup and has the lifetime of a
//! single simulation run.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::common::{FitVerdict, ResourceDemand};
use crate::core::error::{Error, Result};
use crate::core::resource_ledger::HostResources;
use crate::core::vm::{HostRef, VirtualMachine};

/// Host status. `Failed` is terminal: a failed host never again accepts VMs
/// and is never selected as a migration destination.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostState {
    Healthy,
    Failed,
}

/// A simulated physical machine with fixed capacity hosting zero or more VMs.
#[derive(Serialize, Clone, Debug)]
pub struct Host {
    pub id: u32,
    pub state: HostState,
    pub resources: HostResources,
    vms: BTreeSet<u32>,
}

impl Host {
    fn new(id: u32, resources: HostResources) -> Self {
        Self {
            id,
            state: HostState::Healthy,
            resources,
            vms: BTreeSet::new(),
        }
    }

    /// Feasibility check including host health.
    pub fn fits(&self, demand: &ResourceDemand) -> FitVerdict {
        if self.state == HostState::Failed {
            return FitVerdict::HostFailed;
        }
        self.resources.fits(demand)
    }

    /// Ids of VMs currently resident on this host, ascending.
    pub fn resident_vms(&self) -> &BTreeSet<u32> {
        &self.vms
    }
}

/// A named group of hosts owned by one administrative domain.
/// Host ids are unique within a datacenter but may collide across
/// datacenters; all host lookups are therefore datacenter-scoped.
#[derive(Serialize, Clone, Debug)]
pub struct Datacenter {
    pub name: String,
    hosts: BTreeMap<u32, Host>,
}

impl Datacenter {
    /// Hosts in ascending id order, the canonical scan order for placement.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }
}

/// Owns the full datacenter/host/VM graph and provides lookups by id.
#[derive(Serialize, Clone, Debug, Default)]
pub struct TopologyRegistry {
    datacenters: IndexMap<String, Datacenter>,
    vms: BTreeMap<u32, VirtualMachine>,
}

impl TopologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_datacenter(&mut self, name: &str) -> Result<()> {
        if self.datacenters.contains_key(name) {
            return Err(Error::DuplicateDatacenter(name.to_string()));
        }
        self.datacenters.insert(
            name.to_string(),
            Datacenter {
                name: name.to_string(),
                hosts: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn add_host(&mut self, datacenter: &str, host_id: u32, resources: HostResources) -> Result<()> {
        let dc = self.datacenter_mut(datacenter)?;
        if dc.hosts.contains_key(&host_id) {
            return Err(Error::DuplicateHost {
                datacenter: datacenter.to_string(),
                host_id,
            });
        }
        dc.hosts.insert(host_id, Host::new(host_id, resources));
        Ok(())
    }

    /// Registers a VM and places it on the specified host, reserving its
    /// demand. Initial placement mirrors broker-side submission and may
    /// overcommit host resources.
    pub fn place_vm(&mut self, vm: VirtualMachine, datacenter: &str, host_id: u32) -> Result<()> {
        if self.vms.contains_key(&vm.id) {
            return Err(Error::DuplicateVm(vm.id));
        }
        let host = self.host_mut(datacenter, host_id)?;
        host.resources.allocate(vm.id, &vm.demand);
        host.vms.insert(vm.id);
        let mut vm = vm;
        vm.set_host(Some(HostRef {
            datacenter: datacenter.to_string(),
            host_id,
        }));
        self.vms.insert(vm.id, vm);
        Ok(())
    }

    pub fn datacenter(&self, name: &str) -> Result<&Datacenter> {
        self.datacenters
            .get(name)
            .ok_or_else(|| Error::UnknownDatacenter(name.to_string()))
    }

    fn datacenter_mut(&mut self, name: &str) -> Result<&mut Datacenter> {
        self.datacenters
            .get_mut(name)
            .ok_or_else(|| Error::UnknownDatacenter(name.to_string()))
    }

    pub fn host(&self, datacenter: &str, host_id: u32) -> Result<&Host> {
        self.datacenter(datacenter)?
            .hosts
            .get(&host_id)
            .ok_or_else(|| Error::UnknownHost {
                datacenter: datacenter.to_string(),
                host_id,
            })
    }

    fn host_mut(&mut self, datacenter: &str, host_id: u32) -> Result<&mut Host> {
        self.datacenter_mut(datacenter)?
            .hosts
            .get_mut(&host_id)
            .ok_or_else(|| Error::UnknownHost {
                datacenter: datacenter.to_string(),
                host_id,
            })
    }

    pub fn host_state(&self, datacenter: &str, host_id: u32) -> Result<HostState> {
        Ok(self.host(datacenter, host_id)?.state)
    }

    /// Hosts of the datacenter in ascending id order.
    pub fn hosts_of(&self, datacenter: &str) -> Result<Vec<&Host>> {
        Ok(self.datacenter(datacenter)?.hosts().collect())
    }

    /// Defensive snapshot of VM ids resident on the host. Callers mutate
    /// host membership while iterating over the result.
    pub fn vms_resident_on(&self, datacenter: &str, host_id: u32) -> Result<Vec<u32>> {
        Ok(self.host(datacenter, host_id)?.vms.iter().copied().collect())
    }

    pub fn vm(&self, vm_id: u32) -> Result<&VirtualMachine> {
        self.vms.get(&vm_id).ok_or(Error::UnknownVm(vm_id))
    }

    /// Current host of the VM; `None` only before initial placement.
    pub fn vm_host(&self, vm_id: u32) -> Result<Option<HostRef>> {
        Ok(self.vm(vm_id)?.host().cloned())
    }

    /// Ids of all registered VMs, ascending.
    pub fn vm_ids(&self) -> Vec<u32> {
        self.vms.keys().copied().collect()
    }

    /// Reserves the VM's demand on the host. Precondition: a successful
    /// [`Host::fits`] check at the moment of the call. Violating it means
    /// the ledger can no longer be trusted, so the run is aborted.
    pub fn reserve(&mut self, datacenter: &str, host_id: u32, vm_id: u32) -> Result<()> {
        let demand = self.vm(vm_id)?.demand.clone();
        let verdict = self.host(datacenter, host_id)?.fits(&demand);
        if verdict != FitVerdict::Success {
            self.invariant_violation(&format!(
                "reserve of vm #{} on host #{} in {} without a successful fit check: {:?}",
                vm_id, host_id, datacenter, verdict
            ));
        }
        self.host_mut(datacenter, host_id)?.resources.allocate(vm_id, &demand);
        Ok(())
    }

    /// Releases the VM's demand on the host. No-op safe if the VM holds no
    /// reservation there.
    pub fn release(&mut self, datacenter: &str, host_id: u32, vm_id: u32) -> Result<()> {
        self.host_mut(datacenter, host_id)?.resources.release(vm_id);
        Ok(())
    }

    /// Moves the VM between two hosts of one datacenter: removes it from the
    /// source resident set, adds it to the destination, updates the VM's
    /// host reference, in that fixed order. Resource reservations are
    /// handled separately by [`release`](Self::release) and
    /// [`reserve`](Self::reserve).
    pub fn move_vm(&mut self, vm_id: u32, datacenter: &str, from_host: u32, to_host: u32) -> Result<()> {
        self.vm(vm_id)?;
        self.host(datacenter, to_host)?;
        let removed = self.host_mut(datacenter, from_host)?.vms.remove(&vm_id);
        if !removed {
            self.invariant_violation(&format!(
                "move of vm #{} from host #{} in {} where it is not resident",
                vm_id, from_host, datacenter
            ));
        }
        self.host_mut(datacenter, to_host)?.vms.insert(vm_id);
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.set_host(Some(HostRef {
                datacenter: datacenter.to_string(),
                host_id: to_host,
            }));
        }
        Ok(())
    }

    /// Marks the host as failed. Terminal; there is no repair transition.
    pub fn mark_host_failed(&mut self, datacenter: &str, host_id: u32) -> Result<()> {
        self.host_mut(datacenter, host_id)?.state = HostState::Failed;
        Ok(())
    }

    /// Audits the conservation invariants: every VM is reserved on exactly
    /// the host it references, resident sets agree with back-references, and
    /// per-host accounting arithmetic holds. Panics with a full state dump
    /// on violation since the ledger can no longer be trusted.
    pub fn assert_consistent(&self) {
        for vm in self.vms.values() {
            let host_ref = match vm.host() {
                Some(host_ref) => host_ref,
                None => self.invariant_violation(&format!("vm #{} has no host reference", vm.id)),
            };
            let host = match self.host(&host_ref.datacenter, host_ref.host_id) {
                Ok(host) => host,
                Err(e) => self.invariant_violation(&format!("vm #{} references missing host: {}", vm.id, e)),
            };
            if !host.vms.contains(&vm.id) {
                self.invariant_violation(&format!(
                    "vm #{} references host #{} in {} but is not in its resident set",
                    vm.id, host.id, host_ref.datacenter
                ));
            }
            if host.resources.allocation(vm.id) != Some(&vm.demand) {
                self.invariant_violation(&format!(
                    "vm #{} demand is not reserved on its host #{} in {}",
                    vm.id, host.id, host_ref.datacenter
                ));
            }
            let holders = self
                .datacenters
                .values()
                .flat_map(|dc| dc.hosts.values())
                .filter(|h| h.resources.allocation(vm.id).is_some())
                .count();
            if holders != 1 {
                self.invariant_violation(&format!("vm #{} is reserved on {} hosts", vm.id, holders));
            }
        }
        for dc in self.datacenters.values() {
            for host in dc.hosts.values() {
                if let Err(msg) = host.resources.audit() {
                    self.invariant_violation(&format!("host #{} in {}: {}", host.id, dc.name, msg));
                }
            }
        }
    }

    fn invariant_violation(&self, msg: &str) -> ! {
        panic!(
            "invariant violation: {}; registry state: {}",
            msg,
            serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<failed to dump state: {}>", e))
        );
    }
}
