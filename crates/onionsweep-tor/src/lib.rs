//! # onionsweep tor
//!
//! Managed onion-routing daemon instances for benchmark runs.
//!
//! A [`ServiceInstance`] owns one daemon process and its private data
//! directory. It is launched with a generated configuration, gated on the
//! daemon's bootstrap marker, and only then asked which onion services the
//! daemon published. [`spawn_batch`] brings up several instances against a
//! single shared deadline.

pub mod batch;
pub mod discovery;
pub mod instance;
pub mod readiness;
pub mod torrc;

// Re-export main types
pub use batch::{close_all, spawn_batch};
pub use discovery::{DirectoryDiscovery, ServiceDirName, ServiceDiscovery};
pub use instance::{InstanceRequest, InstanceState, ServiceInstance, StateTransition, TorSettings};
pub use readiness::{LineSource, ReadinessWatcher};
