//! [`ServiceInstance`]: one onion-routing daemon and the resources it owns.
//!
//! Lifecycle:
//!
//! ```text
//! Starting ──► AwaitingReadiness ──► Ready
//!    │                │                │
//!    └──► Failed ◄────┘                │
//!           │                          │
//!           └─────────► Closed ◄───────┘   (reachable from every state)
//! ```
//!
//! Endpoints are only read after the readiness marker: the daemon writes the
//! `hostname` files while it bootstraps, so an earlier scan can miss them.

use crate::discovery::{DirectoryDiscovery, ServiceDiscovery};
use crate::readiness::ReadinessWatcher;
use crate::torrc::{self, TORRC_FILE};
use chrono::{DateTime, Utc};
use onionsweep_common::{Error, Result, ServiceEndpoint};
use onionsweep_process::{CommandSpec, Location, OutputLines, OutputMode, ProcessHandle};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// How long to wait for an exit code after the output stream closed.
const EXIT_CODE_GRACE: Duration = Duration::from_millis(200);

/// Instance lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Starting,
    AwaitingReadiness,
    Ready,
    Failed,
    Closed,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Starting => write!(f, "starting"),
            InstanceState::AwaitingReadiness => write!(f, "awaiting_readiness"),
            InstanceState::Ready => write!(f, "ready"),
            InstanceState::Failed => write!(f, "failed"),
            InstanceState::Closed => write!(f, "closed"),
        }
    }
}

impl InstanceState {
    pub fn is_valid_transition(&self, target: InstanceState) -> bool {
        match (*self, target) {
            (InstanceState::Starting, InstanceState::AwaitingReadiness) => true,
            (InstanceState::Starting, InstanceState::Failed) => true,
            (InstanceState::AwaitingReadiness, InstanceState::Ready) => true,
            (InstanceState::AwaitingReadiness, InstanceState::Failed) => true,

            // Teardown is always allowed
            (_, InstanceState::Closed) => true,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Closed)
    }
}

/// A recorded state change.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from_state: InstanceState,
    pub to_state: InstanceState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// How daemons are launched and gated.
#[derive(Debug, Clone)]
pub struct TorSettings {
    /// Daemon executable and leading arguments; `-f <torrc>` is appended.
    pub command: CommandSpec,
    pub startup_timeout: Duration,
    pub readiness_marker: String,
}

impl Default for TorSettings {
    fn default() -> Self {
        Self {
            command: CommandSpec::new("tor"),
            startup_timeout: Duration::from_secs(20),
            readiness_marker: "100%".to_string(),
        }
    }
}

/// Parameters for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub name: String,
    pub socks_port: u16,
    /// Advertised port to local port.
    pub service_ports: BTreeMap<u16, u16>,
}

impl InstanceRequest {
    /// A client-side instance that only offers a SOCKS proxy.
    pub fn client(name: impl Into<String>, socks_port: u16) -> Self {
        Self {
            name: name.into(),
            socks_port,
            service_ports: BTreeMap::new(),
        }
    }

    /// An instance publishing a single onion service.
    pub fn service(
        name: impl Into<String>,
        socks_port: u16,
        advertised_port: u16,
        local_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            socks_port,
            service_ports: BTreeMap::from([(advertised_port, local_port)]),
        }
    }
}

/// One running onion-routing daemon.
///
/// The instance exclusively owns its process and its data directory and
/// releases both in [`ServiceInstance::close`]. Dropping an instance that was
/// not closed kills the process and removes the directory on a best-effort
/// basis.
#[derive(Debug)]
pub struct ServiceInstance {
    name: String,
    socks_port: u16,
    service_ports: BTreeMap<u16, u16>,
    directory: PathBuf,
    process: Option<ProcessHandle>,
    output: Option<OutputLines>,
    endpoints: BTreeMap<u16, ServiceEndpoint>,
    readiness_marker: String,
    startup_timeout: Duration,
    state: InstanceState,
    history: Vec<StateTransition>,
}

impl ServiceInstance {
    /// Launch a daemon and wait until it is ready, using
    /// [`DirectoryDiscovery`] and the settings' startup timeout.
    ///
    /// On failure the instance is closed before the error is returned.
    pub async fn spawn(settings: &TorSettings, request: InstanceRequest) -> Result<Self> {
        Self::spawn_with(settings, request, &DirectoryDiscovery).await
    }

    /// Like [`ServiceInstance::spawn`] with a custom discovery strategy.
    pub async fn spawn_with(
        settings: &TorSettings,
        request: InstanceRequest,
        discovery: &dyn ServiceDiscovery,
    ) -> Result<Self> {
        let mut instance = Self::launch(settings, request)?;
        let deadline = Instant::now() + settings.startup_timeout;
        if let Err(e) = instance.wait_ready(deadline, discovery).await {
            if let Err(close_err) = instance.close().await {
                warn!(instance = %instance.name, error = %close_err, "Teardown after failed startup failed");
            }
            return Err(e);
        }
        Ok(instance)
    }

    /// Create the private directory, write the configuration and start the
    /// daemon. The returned instance is awaiting readiness.
    pub fn launch(settings: &TorSettings, request: InstanceRequest) -> Result<Self> {
        let directory = tempfile::Builder::new()
            .prefix("onionsweep-tor-")
            .tempdir()?
            .into_path();

        let mut instance = Self {
            name: request.name,
            socks_port: request.socks_port,
            service_ports: request.service_ports,
            directory,
            process: None,
            output: None,
            endpoints: BTreeMap::new(),
            readiness_marker: settings.readiness_marker.clone(),
            startup_timeout: settings.startup_timeout,
            state: InstanceState::Starting,
            history: Vec::new(),
        };

        if let Err(e) = instance.start_process(&settings.command) {
            instance.transition(InstanceState::Failed, Some(e.to_string()));
            instance.remove_directory();
            instance.transition(InstanceState::Closed, None);
            return Err(e);
        }

        instance.transition(InstanceState::AwaitingReadiness, None);
        Ok(instance)
    }

    fn start_process(&mut self, command: &CommandSpec) -> Result<()> {
        let config = torrc::render(&self.directory, self.socks_port, &self.service_ports);
        debug!(instance = %self.name, "torrc:\n{}", config);
        let torrc_path = self.directory.join(TORRC_FILE);
        fs::write(&torrc_path, config)?;

        let spec = command.with_args(["-f".to_string(), torrc_path.to_string_lossy().into_owned()]);
        let mut process = ProcessHandle::spawn(&self.name, &spec, &Location::Local, OutputMode::Captured)?;
        self.output = process.take_output();
        self.process = Some(process);

        info!(
            instance = %self.name,
            socks_port = self.socks_port,
            directory = %self.directory.display(),
            "Waiting for daemon to bootstrap"
        );
        Ok(())
    }

    /// Wait for the readiness marker until `deadline`, then discover the
    /// published services.
    ///
    /// A timeout leaves the process running; the caller decides whether to
    /// close the instance.
    pub async fn wait_ready(
        &mut self,
        deadline: Instant,
        discovery: &dyn ServiceDiscovery,
    ) -> Result<()> {
        if self.state != InstanceState::AwaitingReadiness {
            return Err(Error::config(format!(
                "{} cannot await readiness in state {}",
                self.name, self.state
            )));
        }

        let watcher = ReadinessWatcher::new(&self.name, &self.readiness_marker);
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| Error::config(format!("{} has no output stream", self.name)))?;

        let outcome = timeout_at(deadline, watcher.watch(output)).await;
        match outcome {
            Err(_) => {
                let err = Error::startup_timeout(&self.name, self.startup_timeout);
                self.transition(InstanceState::Failed, Some(err.to_string()));
                return Err(err);
            }
            Ok(Err(Error::ProcessExited { .. })) => {
                let exit_code = self.exit_code().await;
                let err = Error::process_exited(&self.name, exit_code);
                self.transition(InstanceState::Failed, Some(err.to_string()));
                return Err(err);
            }
            Ok(Err(e)) => {
                self.transition(InstanceState::Failed, Some(e.to_string()));
                return Err(e);
            }
            Ok(Ok(_)) => {}
        }

        // Stop buffering output; the forwarders keep draining the pipes.
        self.output = None;

        let endpoints = match self.discover(discovery) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                self.transition(InstanceState::Failed, Some(e.to_string()));
                return Err(e);
            }
        };
        self.endpoints = endpoints;
        self.transition(InstanceState::Ready, None);

        for endpoint in self.endpoints.values() {
            info!(instance = %self.name, endpoint = %endpoint, "Onion service published");
        }
        Ok(())
    }

    fn discover(&self, discovery: &dyn ServiceDiscovery) -> Result<BTreeMap<u16, ServiceEndpoint>> {
        let endpoints = discovery.discover(&self.directory)?;
        for advertised in self.service_ports.keys() {
            if !endpoints.contains_key(advertised) {
                return Err(Error::discovery(
                    &self.directory,
                    format!("no published service for advertised port {}", advertised),
                ));
            }
        }
        Ok(endpoints)
    }

    async fn exit_code(&mut self) -> Option<i32> {
        let process = self.process.as_mut()?;
        match process.wait_timeout(EXIT_CODE_GRACE).await {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }

    /// Kill the daemon and remove its directory. Closing an already closed
    /// instance is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }

        let mut result = Ok(());
        self.output = None;
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill().await {
                result = Err(e);
            }
        }
        if let Err(e) = fs::remove_dir_all(&self.directory) {
            if e.kind() != std::io::ErrorKind::NotFound && result.is_ok() {
                result = Err(Error::Io(e));
            }
        }

        self.endpoints.clear();
        self.transition(InstanceState::Closed, None);
        debug!(instance = %self.name, "Instance closed");
        result
    }

    fn remove_directory(&self) {
        if let Err(e) = fs::remove_dir_all(&self.directory) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(instance = %self.name, error = %e, "Failed to remove data directory");
            }
        }
    }

    fn transition(&mut self, to: InstanceState, reason: Option<String>) {
        if self.state == to {
            return;
        }
        debug_assert!(
            self.state.is_valid_transition(to),
            "invalid transition {} -> {}",
            self.state,
            to
        );
        debug!(instance = %self.name, from = %self.state, to = %to, "State transition");
        self.history.push(StateTransition {
            from_state: self.state,
            to_state: to,
            timestamp: Utc::now(),
            reason,
        });
        self.state = to;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn socks_port(&self) -> u16 {
        self.socks_port
    }

    /// Loopback address of this instance's SOCKS proxy.
    pub fn socks_address(&self) -> String {
        format!("127.0.0.1:{}", self.socks_port)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid())
    }

    /// Published services keyed by advertised port; empty until `Ready`.
    pub fn endpoints(&self) -> &BTreeMap<u16, ServiceEndpoint> {
        &self.endpoints
    }

    pub fn endpoint(&self, advertised_port: u16) -> Option<&ServiceEndpoint> {
        self.endpoints.get(&advertised_port)
    }
}

impl Drop for ServiceInstance {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            // The process handle kills the child on drop.
            warn!(instance = %self.name, state = %self.state, "Instance dropped without close");
            self.remove_directory();
        }
    }
}
