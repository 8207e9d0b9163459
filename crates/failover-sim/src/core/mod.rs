pub mod common;
pub mod config;
pub mod error;
pub mod events;
pub mod failure_injector;
pub mod placement;
pub mod resource_ledger;
pub mod topology;
pub mod vm;
