//! Where each role of a throughput benchmark runs.
//!
//! On one machine both the deaddrop and the benchmark clients use loopback
//! addresses. On a two-node cluster the publish and retrieve benchmarks put
//! the remote node in different roles:
//!
//! | Layout | Deaddrop | Clients |
//! |---|---|---|
//! | [`ClusterLayout::RemoteDeaddrop`] (publish) | peer, `0.0.0.0:<port>` | here, dialing `<peer>:<port>` |
//! | [`ClusterLayout::RemoteClient`] (retrieve) | here, `0.0.0.0:<port>` | peer, dialing `<here>:<port>` |

use crate::config::{ClusterConfig, MeasurementConfig};
use onionsweep_common::{Error, HostName, Result};
use onionsweep_process::Location;
use onionsweep_scenario::BenchmarkKind;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// The two machines of a cluster job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHosts {
    pub local: HostName,
    pub remote: HostName,
}

impl ClusterHosts {
    /// Reads the node file named by `$<nodefile_env>` and the local hostname.
    pub fn discover(config: &ClusterConfig) -> Result<Self> {
        let nodefile = std::env::var_os(&config.nodefile_env).ok_or_else(|| {
            Error::cluster(format!("{} is not set; not inside a cluster job?", config.nodefile_env))
        })?;
        Self::from_files(Path::new(&nodefile), &config.hostname_file)
    }

    pub fn from_files(nodefile: &Path, hostname_file: &Path) -> Result<Self> {
        let nodes = fs::read_to_string(nodefile)
            .map_err(|e| Error::cluster(format!("reading {}: {}", nodefile.display(), e)))?;
        let local = fs::read_to_string(hostname_file)
            .map_err(|e| Error::cluster(format!("reading {}: {}", hostname_file.display(), e)))?;
        Self::from_nodes(nodes.lines(), local.trim())
    }

    /// The node file lists one line per reserved core, so names repeat.
    /// Exactly two distinct machines are expected, one of them `local`.
    pub fn from_nodes<'a, I>(nodes: I, local: &str) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let machines: BTreeSet<&str> = nodes
            .into_iter()
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .collect();

        if machines.len() != 2 {
            return Err(Error::cluster(format!(
                "expected 2 machines in the job, found {}: {:?}",
                machines.len(),
                machines
            )));
        }
        if !machines.contains(local) {
            return Err(Error::cluster(format!(
                "expected current machine {} to be part of the job: {:?}",
                local, machines
            )));
        }

        let remote = machines
            .into_iter()
            .find(|machine| *machine != local)
            .ok_or_else(|| Error::cluster("no remote machine in the job"))?;

        Ok(Self {
            local: HostName::new(local),
            remote: HostName::new(remote),
        })
    }
}

/// Role assignment on a two-node cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterLayout {
    /// Deaddrop on the peer, clients here. Used by publish throughput.
    RemoteDeaddrop,
    /// Deaddrop here, clients on the peer. Used by retrieve throughput.
    RemoteClient,
}

impl ClusterLayout {
    /// Layout of a throughput benchmark; latency runs have none.
    pub fn for_kind(kind: BenchmarkKind) -> Option<Self> {
        match kind {
            BenchmarkKind::PublishThroughput => Some(ClusterLayout::RemoteDeaddrop),
            BenchmarkKind::RetrieveThroughput => Some(ClusterLayout::RemoteClient),
            BenchmarkKind::Latency => None,
        }
    }
}

/// Where a throughput run happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Local,
    Cluster {
        hosts: ClusterHosts,
        remote_shell: String,
    },
}

/// Concrete launch plan for one throughput run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughputPlan {
    pub server_location: Location,
    /// `--address` passed to the deaddrop.
    pub server_listen: String,
    pub client_location: Location,
    /// `--deaddrop-address` passed to the benchmark.
    pub client_dial: String,
    /// Where stale measurement processes are reaped before and after the run.
    pub cleanup_locations: Vec<Location>,
    pub server_grace: Duration,
}

impl ThroughputPlan {
    pub fn is_distributed(&self) -> bool {
        self.cleanup_locations.iter().any(|location| !location.is_local())
    }
}

impl Topology {
    pub fn cluster(config: &ClusterConfig) -> Result<Self> {
        let hosts = ClusterHosts::discover(config)?;
        info!(local = %hosts.local, remote = %hosts.remote, "Cluster topology");
        Ok(Topology::Cluster {
            hosts,
            remote_shell: config.remote_shell.clone(),
        })
    }

    pub fn plan(&self, layout: ClusterLayout, measurement: &MeasurementConfig) -> ThroughputPlan {
        let port = measurement.deaddrop_port;
        match self {
            Topology::Local => {
                let loopback = format!("127.0.0.1:{}", port);
                ThroughputPlan {
                    server_location: Location::Local,
                    server_listen: loopback.clone(),
                    client_location: Location::Local,
                    client_dial: loopback,
                    cleanup_locations: vec![Location::Local],
                    server_grace: measurement.server_grace,
                }
            }
            Topology::Cluster {
                hosts,
                remote_shell,
            } => {
                let here = Location::Local;
                let peer = Location::remote(remote_shell.as_str(), hosts.remote.clone());
                let (server_location, client_location, dial_host) = match layout {
                    ClusterLayout::RemoteDeaddrop => (peer, here, &hosts.remote),
                    ClusterLayout::RemoteClient => (here, peer, &hosts.local),
                };
                ThroughputPlan {
                    server_location,
                    server_listen: format!("0.0.0.0:{}", port),
                    client_location,
                    client_dial: dial_host.socket_address(port),
                    cleanup_locations: vec![
                        Location::remote(remote_shell.as_str(), hosts.local.clone()),
                        Location::remote(remote_shell.as_str(), hosts.remote.clone()),
                    ],
                    server_grace: measurement.cluster_server_grace,
                }
            }
        }
    }
}
