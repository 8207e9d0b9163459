//! Observable failover events and the event log.
//!
//! The event log is the reporting surface of the core: after a run it holds
//! the complete ordered history of migrations and stranded VMs.

use std::fs::File;

use serde::Serialize;

/// Why a displaced VM could not be migrated.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrandReason {
    /// No healthy candidate host exists in the datacenter.
    NoHealthyHost,
    /// Healthy hosts exist but none has enough free capacity.
    InsufficientCapacity,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub enum FailoverEvent {
    VmMigrated {
        time: f64,
        vm_id: u32,
        source_host: u32,
        destination_host: u32,
    },
    VmStranded {
        time: f64,
        vm_id: u32,
        host_id: u32,
        reason: StrandReason,
    },
}

// Flat row shape for CSV export.
#[derive(Serialize)]
struct EventRecord {
    time: f64,
    event: &'static str,
    vm_id: u32,
    source_host: u32,
    destination_host: Option<u32>,
    reason: Option<StrandReason>,
}

/// Ordered history of failover events produced during a run.
#[derive(Default, Clone, Debug)]
pub struct EventLog {
    events: Vec<FailoverEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: FailoverEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[FailoverEvent] {
        &self.events
    }

    pub fn save_csv(&self, path: &str) -> Result<(), std::io::Error> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for event in &self.events {
            let record = match *event {
                FailoverEvent::VmMigrated {
                    time,
                    vm_id,
                    source_host,
                    destination_host,
                } => EventRecord {
                    time,
                    event: "migrated",
                    vm_id,
                    source_host,
                    destination_host: Some(destination_host),
                    reason: None,
                },
                FailoverEvent::VmStranded {
                    time,
                    vm_id,
                    host_id,
                    reason,
                } => EventRecord {
                    time,
                    event: "stranded",
                    vm_id,
                    source_host: host_id,
                    destination_host: None,
                    reason: Some(reason),
                },
            };
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
