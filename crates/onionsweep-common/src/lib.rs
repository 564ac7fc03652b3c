//! # onionsweep common
//!
//! Error types and small value types shared by every onionsweep crate.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, Result, ResultExt};
pub use types::{HostName, ServiceEndpoint};
