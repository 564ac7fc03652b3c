//! Sweep configuration.
//!
//! Every field has a default, so an empty document (or no file at all)
//! yields the stock setup: `tor` from `PATH`, the measurement binary at
//! `./bin/anonycast` and results under `benchmark/`.
//!
//! ```yaml
//! output_root: /data/benchmark
//! tor:
//!   startup_timeout: 30s
//! measurement:
//!   timeout: 8m
//! retry:
//!   max_attempts: 3
//!   delay: 500ms
//! ```

pub mod validation;

use crate::supervisor::RetryPolicy;
use anyhow::{Context, Result};
use onionsweep_common::Error;
use onionsweep_process::CommandSpec;
use onionsweep_tor::TorSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Directory holding one subdirectory per run (`publish`, `latency0`, ...).
    pub output_root: PathBuf,
    pub tor: TorConfig,
    pub measurement: MeasurementConfig,
    pub throughput: ThroughputConfig,
    pub latency: LatencyRunConfig,
    pub cluster: ClusterConfig,
    pub retry: RetryConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("benchmark"),
            tor: TorConfig::default(),
            measurement: MeasurementConfig::default(),
            throughput: ThroughputConfig::default(),
            latency: LatencyRunConfig::default(),
            cluster: ClusterConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Onion-routing daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorConfig {
    pub program: String,
    /// Arguments placed before `-f <torrc>`.
    pub args: Vec<String>,
    #[serde(with = "duration_serde")]
    pub startup_timeout: Duration,
    /// Process name matched by stale cleanup.
    pub process_name: String,
    /// SOCKS port of the first instance; later instances count up from it.
    pub socks_base_port: u16,
    /// Local port of the first deaddrop's onion service.
    pub deaddrop_base_port: u16,
    /// Port the deaddrop services are advertised on.
    pub onion_service_port: u16,
    pub readiness_marker: String,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            program: "tor".to_string(),
            args: Vec::new(),
            startup_timeout: Duration::from_secs(20),
            process_name: "tor".to_string(),
            socks_base_port: 9000,
            deaddrop_base_port: 5000,
            onion_service_port: 80,
            readiness_marker: "100%".to_string(),
        }
    }
}

impl TorConfig {
    pub fn settings(&self) -> TorSettings {
        TorSettings {
            command: CommandSpec::new(&self.program).with_args(self.args.iter().cloned()),
            startup_timeout: self.startup_timeout,
            readiness_marker: self.readiness_marker.clone(),
        }
    }
}

/// The measurement binary and how long it may run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    pub program: String,
    /// Arguments placed before the role's own arguments.
    pub args: Vec<String>,
    /// Process name matched by stale cleanup.
    pub process_name: String,
    /// Wall-clock bound for one measurement run.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Pause between starting the deaddrop and starting the clients on one
    /// machine. The deaddrop has no readiness signal, so this is a heuristic.
    #[serde(with = "duration_serde")]
    pub server_grace: Duration,
    /// Same pause when the deaddrop runs on the other cluster node.
    #[serde(with = "duration_serde")]
    pub cluster_server_grace: Duration,
    /// Port the throughput deaddrop listens on.
    pub deaddrop_port: u16,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            program: "./bin/anonycast".to_string(),
            args: Vec::new(),
            process_name: "anonycast".to_string(),
            timeout: Duration::from_secs(500),
            server_grace: Duration::from_secs(1),
            cluster_server_grace: Duration::from_secs(2),
            deaddrop_port: 5000,
        }
    }
}

impl MeasurementConfig {
    /// Command for the measurement binary. A relative program path is made
    /// absolute so the same command line works through the remote shell.
    pub fn command(&self) -> onionsweep_common::Result<CommandSpec> {
        let program = Path::new(&self.program);
        let program = if program.is_relative() && self.program.contains('/') {
            std::env::current_dir()
                .map_err(|e| Error::Io(e).context("resolving current directory"))?
                .join(program)
                .to_string_lossy()
                .into_owned()
        } else {
            self.program.clone()
        };
        Ok(CommandSpec::new(program).with_args(self.args.iter().cloned()))
    }
}

/// Fixed parameters of both throughput benchmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    pub runtime_secs: u64,
    pub difficulty: u32,
    pub prepared_messages: u64,
    pub publish_acceptance_window: u64,
    pub retrieve_acceptance_window: u64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            runtime_secs: 15,
            difficulty: 8,
            prepared_messages: 30 * 5000,
            publish_acceptance_window: 1 << 32,
            retrieve_acceptance_window: 100,
        }
    }
}

/// Fixed parameters of the latency benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyRunConfig {
    pub acceptance_window: u64,
    /// Runs per scenario, written to `latency0` .. `latency<n-1>`.
    pub repetitions: u32,
    /// Pause after killing stale daemons so their ports are released.
    #[serde(with = "duration_serde")]
    pub stale_cleanup_grace: Duration,
    /// Cap on daemon batch acquisitions per run; unlimited when absent.
    pub max_acquisition_attempts: Option<u32>,
}

impl Default for LatencyRunConfig {
    fn default() -> Self {
        Self {
            acceptance_window: 100,
            repetitions: 5,
            stale_cleanup_grace: Duration::from_secs(2),
            max_acquisition_attempts: None,
        }
    }
}

/// Two-node cluster discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Invoked as `<remote_shell> <host> <command line>`.
    pub remote_shell: String,
    /// Environment variable naming the job's node file.
    pub nodefile_env: String,
    pub hostname_file: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            remote_shell: "oarsh".to_string(),
            nodefile_env: "OAR_NODEFILE".to_string(),
            hostname_file: PathBuf::from("/etc/hostname"),
        }
    }
}

/// Supervisor retry behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per scenario; retries forever when absent.
    pub max_attempts: Option<u32>,
    #[serde(with = "duration_serde")]
    pub delay: Duration,
    pub backoff_multiplier: f64,
    #[serde(with = "duration_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: self.delay,
            backoff_multiplier: self.backoff_multiplier,
            max_delay: self.max_delay,
        }
    }
}

impl SweepConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        let config: SweepConfig = if content.trim().is_empty() {
            SweepConfig::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

// Durations are written with a unit suffix: "500ms", "20s", "8m"
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // "ms" before "s"
        if let Some(num_str) = s.strip_suffix("ms") {
            let millis: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num_str) = s.strip_suffix('s') {
            let secs: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num_str) = s.strip_suffix('m') {
            let mins: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(mins * 60))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
