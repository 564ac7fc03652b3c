//! # onionsweep driver
//!
//! Everything between a sweep definition and the processes on disk:
//!
//! - [`SweepConfig`]: YAML configuration with defaults for every field
//! - [`Topology`]: single machine or a two-node cluster, and which host
//!   runs which role of a throughput benchmark
//! - [`RunDriver`]: runs one scenario and tears down everything it started
//! - [`SweepSupervisor`]: walks a sweep, skips finished scenarios and
//!   retries failed ones under a [`RetryPolicy`]

pub mod args;
pub mod config;
pub mod driver;
pub mod supervisor;
pub mod topology;

// Re-export main types
pub use config::SweepConfig;
pub use driver::RunDriver;
pub use supervisor::{RetryPolicy, ScenarioRunner, SweepReport, SweepSupervisor};
pub use topology::{ClusterHosts, ClusterLayout, ThroughputPlan, Topology};
