//! Value types shared by the daemon, driver and scenario crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network name of a machine taking part in a run.
///
/// # Example
/// ```
/// use onionsweep_common::HostName;
///
/// let host = HostName::from("paravance-12");
/// assert_eq!(host.socket_address(5000), "paravance-12:5000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostName(String);

impl HostName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `host:port` as accepted by the measurement binary.
    pub fn socket_address(&self, port: u16) -> String {
        format!("{}:{}", self.0, port)
    }
}

impl From<&str> for HostName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HostName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One published onion service, as discovered after the daemon bootstrapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Port advertised on the onion address.
    pub advertised_port: u16,
    /// Loopback port the daemon forwards traffic to.
    pub local_port: u16,
    /// Daemon-generated `.onion` address.
    pub address: String,
}

impl ServiceEndpoint {
    /// Loopback address the server role has to listen on.
    pub fn local_listen_address(&self) -> String {
        format!("127.0.0.1:{}", self.local_port)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> 127.0.0.1:{}",
            self.address, self.advertised_port, self.local_port
        )
    }
}
