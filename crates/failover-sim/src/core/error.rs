//! Errors reported to callers issuing bad lookups or placements.
//!
//! These errors are recoverable and never corrupt registry state. Invariant
//! violations (e.g. a reservation committed without a successful fit check)
//! are programming errors and abort the run via panic with a state dump.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown datacenter {0}")]
    UnknownDatacenter(String),
    #[error("unknown host #{host_id} in datacenter {datacenter}")]
    UnknownHost { datacenter: String, host_id: u32 },
    #[error("unknown vm #{0}")]
    UnknownVm(u32),
    #[error("datacenter {0} is already registered")]
    DuplicateDatacenter(String),
    #[error("host #{host_id} is already registered in datacenter {datacenter}")]
    DuplicateHost { datacenter: String, host_id: u32 },
    #[error("vm #{0} is already registered")]
    DuplicateVm(u32),
    #[error("no suitable host for vm #{0}")]
    NoSuitableHost(u32),
}
