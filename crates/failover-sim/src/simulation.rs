//! Simulation facade tying the core components to a simulated timeline.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use crate::core::common::ResourceDemand;
use crate::core::config::SimulationConfig;
use crate::core::error::{Error, Result};
use crate::core::events::{EventLog, FailoverEvent};
use crate::core::failure_injector::FailureInjector;
use crate::core::placement::{placement_policy_resolver, PlacementPolicy};
use crate::core::resource_ledger::HostResources;
use crate::core::topology::{HostState, TopologyRegistry};
use crate::core::vm::{HostRef, VirtualMachine};

#[derive(Clone, Debug)]
struct ScheduledFailure {
    at_time: f64,
    datacenter: String,
    host_id: u32,
}

/// Owns the topology registry, the failure injector and the event log, and
/// replays scheduled host failures on a simulated clock.
///
/// The external discrete-event driver interacts with the cluster only
/// through this facade: it populates the topology once before the workload
/// starts, triggers failures at scheduled times, and reads final state and
/// the event log afterwards. All mutation happens on a single logical
/// thread, so each eviction pass is atomic with respect to registry state.
pub struct ClusterSimulation {
    topology: Rc<RefCell<TopologyRegistry>>,
    injector: FailureInjector,
    event_log: Rc<RefCell<EventLog>>,
    placement: Box<dyn PlacementPolicy>,
    schedule: Vec<ScheduledFailure>,
    clock: f64,
}

impl ClusterSimulation {
    /// Creates an empty simulation with the first-fit placement policy.
    pub fn new() -> Self {
        Self::with_policy("FirstFit")
    }

    pub fn with_policy(policy_name: &str) -> Self {
        let topology = rc!(refcell!(TopologyRegistry::new()));
        let event_log = rc!(refcell!(EventLog::new()));
        let injector = FailureInjector::new(
            topology.clone(),
            placement_policy_resolver(policy_name),
            event_log.clone(),
        );
        Self {
            topology,
            injector,
            event_log,
            placement: placement_policy_resolver(policy_name),
            schedule: Vec::new(),
            clock: 0.,
        }
    }

    /// Builds the whole cluster from a configuration: datacenters with
    /// their host tiers, initial VM placement and the failure schedule.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let mut sim = Self::with_policy(&config.placement_policy);
        for dc in &config.datacenters {
            sim.add_datacenter(&dc.name)?;
            for tier in &dc.tiers {
                for i in 0..tier.host_count {
                    sim.add_host(
                        &dc.name,
                        tier.first_host_id + i,
                        HostResources::new(
                            tier.pes_per_host,
                            tier.mips_per_pe,
                            tier.memory_per_host,
                            tier.bandwidth_per_host,
                            tier.storage_per_host,
                        ),
                    )?;
                }
            }
        }
        for vm in &config.vms {
            sim.spawn_vm(
                vm.id,
                ResourceDemand {
                    mips_per_pe: vm.mips,
                    pe_count: vm.pe_count,
                    memory: vm.memory,
                    bandwidth: vm.bandwidth,
                    storage: vm.storage,
                },
                &vm.datacenter,
            )?;
        }
        for failure in &config.failures {
            sim.schedule_host_failure(&failure.datacenter, failure.host_id, failure.at_time);
        }
        Ok(sim)
    }

    pub fn add_datacenter(&mut self, name: &str) -> Result<()> {
        self.topology.borrow_mut().add_datacenter(name)
    }

    pub fn add_host(&mut self, datacenter: &str, host_id: u32, resources: HostResources) -> Result<()> {
        self.topology.borrow_mut().add_host(datacenter, host_id, resources)
    }

    /// Places a new VM on the first fitting host of the datacenter.
    pub fn spawn_vm(&mut self, vm_id: u32, demand: ResourceDemand, datacenter: &str) -> Result<u32> {
        let host_id = {
            let topology = self.topology.borrow();
            let candidates = topology.hosts_of(datacenter)?;
            self.placement
                .select_host(&demand, &candidates, None)
                .map_err(|_| Error::NoSuitableHost(vm_id))?
        };
        self.topology
            .borrow_mut()
            .place_vm(VirtualMachine::new(vm_id, demand), datacenter, host_id)?;
        Ok(host_id)
    }

    /// Places a new VM on an explicit host, mirroring broker-side
    /// submission. May overcommit the host's resources.
    pub fn spawn_vm_on(&mut self, vm_id: u32, demand: ResourceDemand, datacenter: &str, host_id: u32) -> Result<()> {
        self.topology
            .borrow_mut()
            .place_vm(VirtualMachine::new(vm_id, demand), datacenter, host_id)
    }

    /// Registers a host failure to be injected at the given simulated time.
    pub fn schedule_host_failure(&mut self, datacenter: &str, host_id: u32, at_time: f64) {
        self.schedule.push(ScheduledFailure {
            at_time,
            datacenter: datacenter.to_string(),
            host_id,
        });
    }

    /// Injects a host failure immediately, at the current simulated time.
    pub fn trigger_host_failure(&mut self, datacenter: &str, host_id: u32) -> Result<()> {
        self.injector.fail_host(self.clock, datacenter, host_id)
    }

    /// Processes the next scheduled failure, advancing the clock to its
    /// time. Returns false if the schedule is exhausted.
    pub fn step(&mut self) -> Result<bool> {
        // Stable ordering: equal times fire in registration order.
        let next = self
            .schedule
            .iter()
            .enumerate()
            .min_by(|(ai, a), (bi, b)| a.at_time.total_cmp(&b.at_time).then(ai.cmp(bi)))
            .map(|(i, _)| i);
        let failure = match next {
            Some(i) => self.schedule.remove(i),
            None => return Ok(false),
        };
        if failure.at_time > self.clock {
            self.clock = failure.at_time;
        }
        self.injector.fail_host(self.clock, &failure.datacenter, failure.host_id)?;
        Ok(true)
    }

    /// Runs the failure schedule to completion.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    pub fn current_time(&self) -> f64 {
        self.clock
    }

    pub fn host_state(&self, datacenter: &str, host_id: u32) -> Result<HostState> {
        self.topology.borrow().host_state(datacenter, host_id)
    }

    /// Final resident host of the VM, for reporting.
    pub fn vm_host(&self, vm_id: u32) -> Result<Option<HostRef>> {
        self.topology.borrow().vm_host(vm_id)
    }

    pub fn events(&self) -> Vec<FailoverEvent> {
        self.event_log.borrow().events().to_vec()
    }

    pub fn event_log(&self) -> Rc<RefCell<EventLog>> {
        self.event_log.clone()
    }

    pub fn topology(&self) -> Rc<RefCell<TopologyRegistry>> {
        self.topology.clone()
    }
}

impl Default for ClusterSimulation {
    fn default() -> Self {
        Self::new()
    }
}
