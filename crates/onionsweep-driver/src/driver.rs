//! [`RunDriver`]: one scenario from stale cleanup to teardown.

use crate::args;
use crate::config::SweepConfig;
use crate::supervisor::ScenarioRunner;
use crate::topology::{ClusterLayout, ThroughputPlan, Topology};
use async_trait::async_trait;
use onionsweep_common::{Error, Result, ServiceEndpoint};
use onionsweep_process::{kill_stale, CommandSpec, Location, OutputMode, ProcessHandle};
use onionsweep_scenario::{LatencyConfig, ScenarioConfig, SweepEntry};
use onionsweep_tor::{
    close_all, spawn_batch, DirectoryDiscovery, InstanceRequest, ServiceDiscovery, ServiceInstance,
};
use std::fs;
use std::path::Path;
use tokio::time::sleep;
use tracing::{info, warn};

/// Runs single scenarios. Every process and daemon it starts is torn down
/// before [`RunDriver::run_entry`] returns, whatever the outcome.
pub struct RunDriver {
    config: SweepConfig,
    topology: Topology,
    discovery: Box<dyn ServiceDiscovery>,
}

impl RunDriver {
    pub fn new(config: SweepConfig, topology: Topology) -> Self {
        Self {
            config,
            topology,
            discovery: Box::new(DirectoryDiscovery),
        }
    }

    /// Replace how published onion services are discovered.
    pub fn with_discovery(mut self, discovery: Box<dyn ServiceDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Run one sweep entry, writing its result to `output`.
    pub async fn run_entry(&self, entry: &SweepEntry, output: &Path) -> Result<()> {
        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir)?;
        }

        let scenario = format!("{}/{}", entry.run_dir, entry.id());
        match &entry.config {
            ScenarioConfig::Latency(config) => self.run_latency(&scenario, config, output).await,
            ScenarioConfig::PublishThroughput(config) => {
                let plan = self.throughput_plan(entry)?;
                let client = args::publish_args(config, &self.config.throughput, output, &plan.client_dial);
                let server = args::deaddrop_args(
                    self.config.throughput.difficulty,
                    self.config.throughput.publish_acceptance_window,
                    &plan.server_listen,
                );
                self.run_throughput(&scenario, &plan, server, client).await
            }
            ScenarioConfig::RetrieveThroughput(config) => {
                let plan = self.throughput_plan(entry)?;
                let client = args::retrieve_args(config, &self.config.throughput, output, &plan.client_dial);
                let server = args::deaddrop_args(
                    self.config.throughput.difficulty,
                    self.config.throughput.retrieve_acceptance_window,
                    &plan.server_listen,
                );
                self.run_throughput(&scenario, &plan, server, client).await
            }
        }
    }

    fn throughput_plan(&self, entry: &SweepEntry) -> Result<ThroughputPlan> {
        let kind = entry.config.kind();
        let layout = ClusterLayout::for_kind(kind)
            .ok_or_else(|| Error::config(format!("{} runs have no cluster layout", kind)))?;
        Ok(self.topology.plan(layout, &self.config.measurement))
    }

    /// Latency runs always stay on this machine; the onion network supplies
    /// the distance between the parties.
    async fn run_latency(&self, scenario: &str, config: &LatencyConfig, output: &Path) -> Result<()> {
        self.kill_stale_daemons().await;
        let mut instances = self.acquire_instances(config.deaddrops).await?;

        let result = self.measure_latency(scenario, config, &instances, output).await;

        close_all(&mut instances).await;
        result
    }

    /// Bring up `deaddrops` service instances plus one client instance,
    /// retrying the whole batch while failures are startup failures.
    async fn acquire_instances(&self, deaddrops: u32) -> Result<Vec<ServiceInstance>> {
        let settings = self.config.tor.settings();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match spawn_batch(&settings, self.instance_requests(deaddrops)?, self.discovery.as_ref()).await {
                Ok(instances) => return Ok(instances),
                Err(e) if e.is_startup_failure() => {
                    let exhausted = self
                        .config
                        .latency
                        .max_acquisition_attempts
                        .map_or(false, |max| attempt >= max);
                    if exhausted {
                        return Err(e.context(format!("daemon startup failed {} times", attempt)));
                    }
                    warn!(attempt, error = %e, "Refreshing daemon instances");
                    self.kill_stale_daemons().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Deaddrop `i` gets SOCKS port `socks_base + i` and publishes
    /// `onion_service_port -> deaddrop_base + i`; the client takes the next
    /// SOCKS port.
    fn instance_requests(&self, deaddrops: u32) -> Result<Vec<InstanceRequest>> {
        let tor = &self.config.tor;
        let port = |base: u16, offset: u32| -> Result<u16> {
            u16::try_from(u32::from(base) + offset)
                .map_err(|_| Error::config(format!("port {} + {} is out of range", base, offset)))
        };

        let mut requests = Vec::with_capacity(deaddrops as usize + 1);
        for i in 0..deaddrops {
            requests.push(InstanceRequest::service(
                format!("deaddrop-{}", i),
                port(tor.socks_base_port, i)?,
                tor.onion_service_port,
                port(tor.deaddrop_base_port, i)?,
            ));
        }
        requests.push(InstanceRequest::client("client", port(tor.socks_base_port, deaddrops)?));
        Ok(requests)
    }

    async fn measure_latency(
        &self,
        scenario: &str,
        config: &LatencyConfig,
        instances: &[ServiceInstance],
        output: &Path,
    ) -> Result<()> {
        let (client, deaddrops) = instances
            .split_last()
            .ok_or_else(|| Error::config("no daemon instances"))?;

        let service_port = self.config.tor.onion_service_port;
        let endpoints = deaddrops
            .iter()
            .map(|instance| {
                instance.endpoint(service_port).ok_or_else(|| {
                    Error::discovery(
                        instance.directory(),
                        format!("no service on port {}", service_port),
                    )
                })
            })
            .collect::<Result<Vec<&ServiceEndpoint>>>()?;

        let arguments = args::latency_args(
            config,
            &endpoints,
            &client.socks_address(),
            self.config.latency.acceptance_window,
            output,
        );
        let command = self.config.measurement.command()?.with_args(arguments);
        info!(scenario = %scenario, command = %command.shell_line(), "Starting latency measurement");

        let mut process = ProcessHandle::spawn("benchmark", &command, &Location::Local, OutputMode::Inherit)?;
        self.await_measurement(scenario, &mut process).await
    }

    async fn run_throughput(
        &self,
        scenario: &str,
        plan: &ThroughputPlan,
        server_args: Vec<String>,
        client_args: Vec<String>,
    ) -> Result<()> {
        self.kill_stale_measurements(plan).await;

        let command = self.config.measurement.command()?;
        let server_command = command.with_args(server_args);
        let client_command = command.with_args(client_args);

        info!(scenario = %scenario, location = %plan.server_location, command = %server_command.shell_line(), "Starting deaddrop");
        let mut server = ProcessHandle::spawn(
            "deaddrop",
            &server_command,
            &plan.server_location,
            OutputMode::Inherit,
        )?;

        let result = self.run_client(scenario, plan, &client_command).await;

        let teardown = if plan.server_location.is_local() {
            server.terminate(self.config.measurement.server_grace).await
        } else {
            server.kill().await
        };
        if let Err(e) = teardown {
            warn!(scenario = %scenario, error = %e, "Failed to stop deaddrop");
        }
        if plan.is_distributed() {
            self.kill_stale_measurements(plan).await;
        }

        result
    }

    async fn run_client(&self, scenario: &str, plan: &ThroughputPlan, command: &CommandSpec) -> Result<()> {
        // The deaddrop gives no readiness signal.
        sleep(plan.server_grace).await;

        info!(scenario = %scenario, location = %plan.client_location, command = %command.shell_line(), "Starting benchmark");
        let mut client = ProcessHandle::spawn("benchmark", command, &plan.client_location, OutputMode::Inherit)?;
        self.await_measurement(scenario, &mut client).await
    }

    /// Wait for a measurement process within the configured bound. An
    /// overrunning process is killed.
    async fn await_measurement(&self, scenario: &str, process: &mut ProcessHandle) -> Result<()> {
        let timeout = self.config.measurement.timeout;
        match process.wait_timeout(timeout).await? {
            Some(status) if status.success() => {
                info!(scenario = %scenario, "Measurement finished");
                Ok(())
            }
            Some(status) => Err(Error::measurement_failed(scenario, status.code())),
            None => {
                if let Err(e) = process.kill().await {
                    warn!(scenario = %scenario, error = %e, "Failed to kill overrunning measurement");
                }
                Err(Error::measurement_timeout(scenario, timeout))
            }
        }
    }

    async fn kill_stale_daemons(&self) {
        kill_stale(&Location::Local, &self.config.tor.process_name).await;
        sleep(self.config.latency.stale_cleanup_grace).await;
    }

    async fn kill_stale_measurements(&self, plan: &ThroughputPlan) {
        for location in &plan.cleanup_locations {
            kill_stale(location, &self.config.measurement.process_name).await;
        }
    }
}

#[async_trait]
impl ScenarioRunner for RunDriver {
    async fn run(&mut self, entry: &SweepEntry, output: &Path) -> Result<()> {
        self.run_entry(entry, output).await
    }
}
