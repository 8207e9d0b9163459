#![doc = include_str!("../readme.md")]

// Re-exported for use in logging macros.
pub use colored;

pub mod core;
pub mod log;
pub mod simulation;
