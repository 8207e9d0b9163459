use failover_sim::core::common::{FitVerdict, ResourceDemand};
use failover_sim::core::error::Error;
use failover_sim::core::events::StrandReason;
use failover_sim::core::placement::{FirstFit, PlacementPolicy};
use failover_sim::core::resource_ledger::HostResources;
use failover_sim::core::topology::{HostState, TopologyRegistry};
use failover_sim::core::vm::VirtualMachine;
use failover_sim::simulation::ClusterSimulation;

fn demand(mips: u32, pes: u32, memory: u64) -> ResourceDemand {
    ResourceDemand {
        mips_per_pe: mips,
        pe_count: pes,
        memory,
        bandwidth: 100,
        storage: 1000,
    }
}

fn backend_host() -> HostResources {
    // 2 PEs at 2000 MIPS, 4 GiB RAM
    HostResources::new(2, 2000, 4096, 10000, 1000000)
}

#[test]
// All four dimensions must pass; the verdict names the first failing one.
fn test_ledger_fits() {
    let host = backend_host();
    assert_eq!(host.fits(&demand(2000, 2, 4096)), FitVerdict::Success);
    assert_eq!(host.fits(&demand(2000, 3, 1024)), FitVerdict::NotEnoughCpu);
    assert_eq!(host.fits(&demand(1000, 1, 8192)), FitVerdict::NotEnoughMemory);
    let mut greedy = demand(1000, 1, 1024);
    greedy.bandwidth = 20000;
    assert_eq!(host.fits(&greedy), FitVerdict::NotEnoughBandwidth);
    let mut fat = demand(1000, 1, 1024);
    fat.storage = 2000000;
    assert_eq!(host.fits(&fat), FitVerdict::NotEnoughStorage);
}

#[test]
fn test_ledger_allocate_release() {
    let mut host = backend_host();
    host.allocate(1, &demand(2000, 1, 2048));
    assert_eq!(host.cpu_available, 2000);
    assert_eq!(host.memory_available, 2048);
    assert!(host.allocation(1).is_some());

    // repeated allocation of the same VM is a no-op
    host.allocate(1, &demand(2000, 1, 2048));
    assert_eq!(host.cpu_available, 2000);

    host.release(1);
    assert_eq!(host.cpu_available, 4000);
    assert_eq!(host.memory_available, 4096);
    assert!(host.allocation(1).is_none());

    // releasing an absent VM is a no-op
    host.release(42);
    assert_eq!(host.cpu_available, 4000);
    assert!(host.audit().is_ok());
}

#[test]
// Overcommitted demand drains availability to zero and is fully restored
// on release.
fn test_ledger_overcommit() {
    let mut host = backend_host();
    host.allocate(1, &demand(2000, 1, 2048));
    host.allocate(2, &demand(2000, 2, 2048));
    assert_eq!(host.cpu_available, 0);
    assert!(host.overcommitted());
    assert!(host.audit().is_ok());

    host.release(1);
    assert_eq!(host.cpu_available, 0);
    assert!(!host.overcommitted());

    host.release(2);
    assert_eq!(host.cpu_available, 4000);
    assert!(host.audit().is_ok());
}

#[test]
fn test_registry_lookups() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc").unwrap();
    topology.add_host("dc", 1, backend_host()).unwrap();

    assert_eq!(
        topology.add_datacenter("dc"),
        Err(Error::DuplicateDatacenter("dc".to_string()))
    );
    assert_eq!(
        topology.add_host("dc", 1, backend_host()),
        Err(Error::DuplicateHost {
            datacenter: "dc".to_string(),
            host_id: 1
        })
    );
    assert_eq!(
        topology.add_host("other", 2, backend_host()),
        Err(Error::UnknownDatacenter("other".to_string()))
    );
    assert!(matches!(topology.host("dc", 7), Err(Error::UnknownHost { .. })));
    assert_eq!(topology.vm(5).err(), Some(Error::UnknownVm(5)));

    topology
        .place_vm(VirtualMachine::new(5, demand(1000, 1, 1024)), "dc", 1)
        .unwrap();
    assert_eq!(
        topology
            .place_vm(VirtualMachine::new(5, demand(1000, 1, 1024)), "dc", 1)
            .err(),
        Some(Error::DuplicateVm(5))
    );
    let host_ref = topology.vm_host(5).unwrap().unwrap();
    assert_eq!(host_ref.host_id, 1);
    assert_eq!(host_ref.datacenter, "dc");
    topology.assert_consistent();
}

#[test]
// Host id collisions across datacenters are tolerated: lookups and
// placement are always datacenter-scoped.
fn test_registry_host_id_collision_across_datacenters() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc1").unwrap();
    topology.add_datacenter("dc2").unwrap();
    topology.add_host("dc1", 0, backend_host()).unwrap();
    topology.add_host("dc2", 0, backend_host()).unwrap();

    topology
        .place_vm(VirtualMachine::new(1, demand(1000, 1, 1024)), "dc2", 0)
        .unwrap();
    assert_eq!(topology.vms_resident_on("dc1", 0).unwrap(), Vec::<u32>::new());
    assert_eq!(topology.vms_resident_on("dc2", 0).unwrap(), vec![1]);
    topology.assert_consistent();
}

#[test]
// Hosts are scanned in ascending id order regardless of registration order.
fn test_first_fit_scan_order() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc").unwrap();
    topology.add_host("dc", 30, backend_host()).unwrap();
    topology.add_host("dc", 10, backend_host()).unwrap();
    topology.add_host("dc", 20, backend_host()).unwrap();

    let policy = FirstFit::new();
    let hosts = topology.hosts_of("dc").unwrap();
    assert_eq!(policy.select_host(&demand(1000, 1, 1024), &hosts, None), Ok(10));
    assert_eq!(policy.select_host(&demand(1000, 1, 1024), &hosts, Some(10)), Ok(20));
}

#[test]
fn test_first_fit_strand_reasons() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc").unwrap();
    topology.add_host("dc", 1, backend_host()).unwrap();
    topology.add_host("dc", 2, backend_host()).unwrap();

    let policy = FirstFit::new();
    let hosts = topology.hosts_of("dc").unwrap();
    // healthy hosts exist but the demand is too large
    assert_eq!(
        policy.select_host(&demand(2000, 4, 1024), &hosts, None),
        Err(StrandReason::InsufficientCapacity)
    );
    // excluding the only non-failed candidates leaves no healthy host
    topology.mark_host_failed("dc", 2).unwrap();
    let hosts = topology.hosts_of("dc").unwrap();
    assert_eq!(
        policy.select_host(&demand(1000, 1, 1024), &hosts, Some(1)),
        Err(StrandReason::NoHealthyHost)
    );
}

#[test]
fn test_spawn_vm_first_fit() {
    let mut sim = ClusterSimulation::new();
    sim.add_datacenter("dc").unwrap();
    sim.add_host("dc", 0, HostResources::new(2, 1000, 2048, 10000, 1000000))
        .unwrap();
    sim.add_host("dc", 1, HostResources::new(2, 1000, 2048, 10000, 1000000))
        .unwrap();

    assert_eq!(sim.spawn_vm(0, demand(1000, 1, 1024), "dc").unwrap(), 0);
    assert_eq!(sim.spawn_vm(1, demand(1000, 1, 1024), "dc").unwrap(), 0);
    assert_eq!(sim.spawn_vm(2, demand(1000, 1, 1024), "dc").unwrap(), 1);
    assert_eq!(
        sim.spawn_vm(3, demand(1000, 2, 1024), "dc").err(),
        Some(Error::NoSuitableHost(3))
    );
    sim.topology().borrow().assert_consistent();
}

#[test]
fn test_move_vm_updates_backreference() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc").unwrap();
    topology.add_host("dc", 1, backend_host()).unwrap();
    topology.add_host("dc", 2, backend_host()).unwrap();
    topology
        .place_vm(VirtualMachine::new(9, demand(1000, 1, 1024)), "dc", 1)
        .unwrap();

    topology.release("dc", 1, 9).unwrap();
    topology.reserve("dc", 2, 9).unwrap();
    topology.move_vm(9, "dc", 1, 2).unwrap();

    assert_eq!(topology.vm_host(9).unwrap().unwrap().host_id, 2);
    assert_eq!(topology.vms_resident_on("dc", 1).unwrap(), Vec::<u32>::new());
    assert_eq!(topology.vms_resident_on("dc", 2).unwrap(), vec![9]);
    topology.assert_consistent();
}

#[test]
#[should_panic(expected = "invariant violation")]
fn test_reserve_without_fit_check_aborts() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc").unwrap();
    topology.add_host("dc", 1, backend_host()).unwrap();
    topology.add_host("dc", 2, backend_host()).unwrap();
    topology
        .place_vm(VirtualMachine::new(1, demand(2000, 2, 2048)), "dc", 1)
        .unwrap();
    topology
        .place_vm(VirtualMachine::new(2, demand(2000, 2, 2048)), "dc", 2)
        .unwrap();
    // host 2 is already full, reserving vm 1 there violates the precondition
    topology.reserve("dc", 2, 1).unwrap();
}

#[test]
fn test_failed_host_rejects_demand() {
    let mut topology = TopologyRegistry::new();
    topology.add_datacenter("dc").unwrap();
    topology.add_host("dc", 1, backend_host()).unwrap();
    topology.mark_host_failed("dc", 1).unwrap();
    assert_eq!(topology.host_state("dc", 1).unwrap(), HostState::Failed);
    assert_eq!(
        topology.host("dc", 1).unwrap().fits(&demand(1000, 1, 1024)),
        FitVerdict::HostFailed
    );
}
