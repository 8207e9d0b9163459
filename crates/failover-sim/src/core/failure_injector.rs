//! Host failure injection and the eviction pass.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::common::FitVerdict;
use crate::core::error::Result;
use crate::core::events::{EventLog, FailoverEvent, StrandReason};
use crate::core::placement::PlacementPolicy;
use crate::core::topology::{HostState, TopologyRegistry};
use crate::{log_debug, log_info, log_warn};

const NAME: &str = "failure_injector";

/// Drives the fault-tolerance workflow at a scheduled simulated time.
///
/// The whole eviction pass runs to completion on the single simulation
/// thread, so registry state never exposes a partial commit.
pub struct FailureInjector {
    topology: Rc<RefCell<TopologyRegistry>>,
    policy: Box<dyn PlacementPolicy>,
    event_log: Rc<RefCell<EventLog>>,
}

impl FailureInjector {
    pub fn new(
        topology: Rc<RefCell<TopologyRegistry>>,
        policy: Box<dyn PlacementPolicy>,
        event_log: Rc<RefCell<EventLog>>,
    ) -> Self {
        Self {
            topology,
            policy,
            event_log,
        }
    }

    /// Fails the host and evicts its resident VMs.
    ///
    /// Every VM resident on the host is either migrated to a feasible host
    /// of the same datacenter or stranded in place; the host is marked
    /// `Failed` only after all eviction attempts are exhausted. Re-failing
    /// an already failed host is a no-op.
    pub fn fail_host(&mut self, time: f64, datacenter: &str, host_id: u32) -> Result<()> {
        if self.topology.borrow().host_state(datacenter, host_id)? == HostState::Failed {
            log_debug!(time, NAME, "host #{} in {} is already failed, nothing to do", host_id, datacenter);
            return Ok(());
        }
        log_info!(time, NAME, "simulating failure of host #{} in {}", host_id, datacenter);

        // Snapshot before mutation: the loop below changes host membership.
        let displaced = self.topology.borrow().vms_resident_on(datacenter, host_id)?;
        for vm_id in displaced {
            self.evict_vm(time, datacenter, host_id, vm_id)?;
        }
        self.topology.borrow_mut().mark_host_failed(datacenter, host_id)?;
        Ok(())
    }

    fn evict_vm(&mut self, time: f64, datacenter: &str, failed_host: u32, vm_id: u32) -> Result<()> {
        let selection = {
            let topology = self.topology.borrow();
            let demand = topology.vm(vm_id)?.demand.clone();
            let candidates = topology.hosts_of(datacenter)?;
            self.policy.select_host(&demand, &candidates, Some(failed_host))
        };
        match selection {
            Ok(destination) => {
                let mut topology = self.topology.borrow_mut();
                let demand = topology.vm(vm_id)?.demand.clone();
                // Re-check at the moment of commit: earlier migrations in
                // this pass may have consumed capacity on the candidate.
                if topology.host(datacenter, destination)?.fits(&demand) != FitVerdict::Success {
                    drop(topology);
                    self.strand(time, vm_id, failed_host, StrandReason::InsufficientCapacity);
                    return Ok(());
                }
                topology.release(datacenter, failed_host, vm_id)?;
                topology.reserve(datacenter, destination, vm_id)?;
                topology.move_vm(vm_id, datacenter, failed_host, destination)?;
                drop(topology);
                log_info!(
                    time,
                    NAME,
                    "migrated vm #{} from host #{} to host #{}",
                    vm_id,
                    failed_host,
                    destination
                );
                self.event_log.borrow_mut().record(FailoverEvent::VmMigrated {
                    time,
                    vm_id,
                    source_host: failed_host,
                    destination_host: destination,
                });
            }
            Err(reason) => self.strand(time, vm_id, failed_host, reason),
        }
        Ok(())
    }

    fn strand(&mut self, time: f64, vm_id: u32, host_id: u32, reason: StrandReason) {
        log_warn!(
            time,
            NAME,
            "no feasible destination for vm #{}, stranded on host #{}: {:?}",
            vm_id,
            host_id,
            reason
        );
        self.event_log.borrow_mut().record(FailoverEvent::VmStranded {
            time,
            vm_id,
            host_id,
            reason,
        });
    }
}
