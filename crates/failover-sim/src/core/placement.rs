//! VM placement policies.

use crate::core::common::{FitVerdict, ResourceDemand};
use crate::core::events::StrandReason;
use crate::core::topology::{Host, HostState};

/// Trait for implementations of destination host selection.
///
/// The policy is a pure function of the VM demand and a candidate host set:
/// it returns the id of the selected host or the reason why no host
/// qualifies. Candidates are expected in ascending host-id order, which
/// makes selection deterministic and reproducible.
pub trait PlacementPolicy {
    fn select_host(
        &self,
        demand: &ResourceDemand,
        candidates: &[&Host],
        exclude: Option<u32>,
    ) -> Result<u32, StrandReason>;
}

pub fn placement_policy_resolver(policy_name: &str) -> Box<dyn PlacementPolicy> {
    match policy_name {
        "FirstFit" => Box::new(FirstFit::new()),
        _ => panic!("Can't resolve: {}", policy_name),
    }
}

/// Uses the first suitable host in candidate order. A greedy heuristic, not
/// a global optimum; intentional for reproducibility.
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for FirstFit {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementPolicy for FirstFit {
    fn select_host(
        &self,
        demand: &ResourceDemand,
        candidates: &[&Host],
        exclude: Option<u32>,
    ) -> Result<u32, StrandReason> {
        let mut saw_healthy = false;
        for host in candidates {
            if Some(host.id) == exclude || host.state == HostState::Failed {
                continue;
            }
            saw_healthy = true;
            if host.fits(demand) == FitVerdict::Success {
                return Ok(host.id);
            }
        }
        if saw_healthy {
            Err(StrandReason::InsufficientCapacity)
        } else {
            Err(StrandReason::NoHealthyHost)
        }
    }
}
