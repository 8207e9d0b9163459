//! Virtual machine entity.

use serde::Serialize;

use crate::core::common::ResourceDemand;

/// Identifies the host a VM currently resides on.
///
/// Host ids are unique only within a datacenter, so the reference carries
/// the datacenter name as well.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HostRef {
    pub datacenter: String,
    pub host_id: u32,
}

/// Represents a virtual machine.
///
/// VMs are created once during topology construction and never destroyed;
/// only the host back-reference mutates, and only through the topology
/// registry.
#[derive(Serialize, Clone, Debug)]
pub struct VirtualMachine {
    pub id: u32,
    pub demand: ResourceDemand,
    host: Option<HostRef>,
}

impl VirtualMachine {
    pub fn new(id: u32, demand: ResourceDemand) -> Self {
        Self { id, demand, host: None }
    }

    /// Returns the current host reference. `None` only before initial
    /// placement or during the atomic instant of a migration step.
    pub fn host(&self) -> Option<&HostRef> {
        self.host.as_ref()
    }

    pub(crate) fn set_host(&mut self, host: Option<HostRef>) {
        self.host = host;
    }
}
