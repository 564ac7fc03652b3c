//! # onionsweep scenario
//!
//! The parameter spaces swept by the benchmark driver.
//!
//! Every generator is pure and deterministic: the same sweep is recomputed
//! on every invocation, and a scenario's canonical [`ScenarioConfig::id`]
//! names its output file. An existing output file is the only record that a
//! scenario already ran.

pub mod config;
pub mod mode;
pub mod space;
pub mod sweep;

// Re-export main types
pub use config::{BenchmarkKind, LatencyConfig, PublishConfig, RetrieveConfig, ScenarioConfig};
pub use mode::AccessMode;
pub use space::{generate_latency, generate_publish, generate_retrieve};
pub use sweep::{latency_sweep, publish_sweep, retrieve_sweep, SweepEntry};
