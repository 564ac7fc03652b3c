//! Discovery of the onion services a daemon published.
//!
//! Each service lives in a subdirectory of the instance's data directory
//! named `service_<advertised>_<local>`, and the daemon writes the generated
//! address into a `hostname` file inside it once it has bootstrapped.

use onionsweep_common::{Error, Result, ServiceEndpoint};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const SERVICE_DIR_PREFIX: &str = "service_";
pub const HOSTNAME_FILE: &str = "hostname";

/// The `(advertised, local)` port pair encoded in a service directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceDirName {
    pub advertised_port: u16,
    pub local_port: u16,
}

impl ServiceDirName {
    pub fn new(advertised_port: u16, local_port: u16) -> Self {
        Self {
            advertised_port,
            local_port,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}_{}",
            SERVICE_DIR_PREFIX, self.advertised_port, self.local_port
        )
    }

    /// Inverse of [`ServiceDirName::encode`]. Only canonical names decode:
    /// no signs, no leading zeros, exactly two port fields.
    pub fn decode(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(SERVICE_DIR_PREFIX)?;
        let (advertised, local) = rest.split_once('_')?;
        Some(Self {
            advertised_port: parse_port(advertised)?,
            local_port: parse_port(local)?,
        })
    }
}

impl fmt::Display for ServiceDirName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_port(field: &str) -> Option<u16> {
    let canonical = !field.is_empty()
        && field.bytes().all(|b| b.is_ascii_digit())
        && (field == "0" || !field.starts_with('0'));
    if !canonical {
        return None;
    }
    field.parse().ok()
}

/// Produces the endpoints published under a data directory.
///
/// The daemon-backed implementation is [`DirectoryDiscovery`]; tests can
/// substitute their own.
pub trait ServiceDiscovery: Send + Sync {
    /// Endpoints keyed by advertised port.
    fn discover(&self, directory: &Path) -> Result<BTreeMap<u16, ServiceEndpoint>>;
}

/// Scans the data directory for `service_<a>_<l>/hostname` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryDiscovery;

impl ServiceDiscovery for DirectoryDiscovery {
    fn discover(&self, directory: &Path) -> Result<BTreeMap<u16, ServiceEndpoint>> {
        let mut endpoints = BTreeMap::new();

        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(dir_name) = file_name.to_str().and_then(ServiceDirName::decode) else {
                continue;
            };

            let hostname_path = entry.path().join(HOSTNAME_FILE);
            let address = fs::read_to_string(&hostname_path)
                .map_err(|e| Error::discovery(&hostname_path, e.to_string()))?
                .trim()
                .to_string();
            if address.is_empty() {
                return Err(Error::discovery(&hostname_path, "empty hostname file"));
            }

            debug!(service = %dir_name, address = %address, "Discovered onion service");
            endpoints.insert(
                dir_name.advertised_port,
                ServiceEndpoint {
                    advertised_port: dir_name.advertised_port,
                    local_port: dir_name.local_port,
                    address,
                },
            );
        }

        Ok(endpoints)
    }
}
