//! Simulated workload: command generation, driving, and run statistics.

mod generator;
mod runner;
mod stats;

pub use generator::CommandGenerator;
pub use runner::{RunConfig, WorkloadRunner};
pub use stats::RunStats;
