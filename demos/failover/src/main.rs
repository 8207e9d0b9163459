use clap::Parser;
use log::info;

use failover_sim::core::config::SimulationConfig;
use failover_sim::core::events::FailoverEvent;
use failover_sim::simulation::ClusterSimulation;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long, default_value = "config.yaml")]
    config: String,

    /// Save the failover event log to this CSV file
    #[clap(short, long)]
    output: Option<String>,
}

fn main() {
    init_logger();

    let args = Args::parse();
    let config = SimulationConfig::from_file(&args.config);
    info!(
        "Starting multi-tier cluster simulation: {} datacenters, {} hosts, {} VMs",
        config.datacenters.len(),
        config.number_of_hosts(),
        config.vms.len()
    );

    let mut sim = ClusterSimulation::from_config(&config).unwrap_or_else(|e| panic!("Can't build cluster: {}", e));
    sim.run().unwrap_or_else(|e| panic!("Simulation failed: {}", e));
    sim.topology().borrow().assert_consistent();

    info!("Failover events:");
    for event in sim.events() {
        match event {
            FailoverEvent::VmMigrated {
                time,
                vm_id,
                source_host,
                destination_host,
            } => info!(
                "  [{:.3}] vm #{} migrated: host #{} -> host #{}",
                time, vm_id, source_host, destination_host
            ),
            FailoverEvent::VmStranded {
                time,
                vm_id,
                host_id,
                reason,
            } => info!("  [{:.3}] vm #{} stranded on host #{}: {:?}", time, vm_id, host_id, reason),
        }
    }

    info!("Final VM placement:");
    let topology = sim.topology();
    let topology = topology.borrow();
    for vm_id in topology.vm_ids() {
        match topology.vm_host(vm_id).unwrap() {
            Some(host) => info!("  vm #{} on host #{} in {}", vm_id, host.host_id, host.datacenter),
            None => info!("  vm #{} is not placed", vm_id),
        }
    }

    if let Some(path) = &args.output {
        sim.event_log()
            .borrow()
            .save_csv(path)
            .unwrap_or_else(|e| panic!("Can't save event log to {}: {}", path, e));
        info!("Event log saved to {}", path);
    }
}
