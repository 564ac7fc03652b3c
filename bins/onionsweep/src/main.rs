use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use onionsweep_driver::{RunDriver, SweepConfig, SweepSupervisor, Topology};
use onionsweep_scenario::{latency_sweep, publish_sweep, retrieve_sweep, AccessMode, SweepEntry};
use onionsweep_trace::{aggregate_file, CallFilter};

/// Benchmark sweep driver for onion-routed deaddrops
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Run throughput benchmarks across the two nodes of the cluster job
    #[arg(long, global = true)]
    cluster: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Results directory (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    output_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish throughput sweep
    PublishThroughput,
    /// Retrieve throughput sweep
    RetrieveThroughput,
    /// End-to-end latency sweep over the onion network
    Latency {
        /// Only run scenarios of this access mode
        #[arg(long, value_enum)]
        mode: Option<AccessMode>,

        /// Runs per scenario (overrides config)
        #[arg(long)]
        repetitions: Option<u32>,
    },
    /// Rank call sites of a futex contention trace by average wait
    Trace {
        /// Trace captured with `strace -e trace=futex -T --stack-trace`
        file: PathBuf,

        /// Namespace a frame must belong to for attribution
        #[arg(long, default_value = "anonycast::")]
        namespace: String,

        /// Emit JSON (durations in seconds) instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.debug)?;

    let mut config = load_config(&args)?;

    let (entries, topology) = match &args.command {
        Command::Trace {
            file,
            namespace,
            json,
        } => return run_trace(file, namespace, *json),
        Command::PublishThroughput => (publish_sweep(), throughput_topology(&args, &config)?),
        Command::RetrieveThroughput => (retrieve_sweep(), throughput_topology(&args, &config)?),
        Command::Latency { mode, repetitions } => {
            if args.cluster {
                warn!("Latency sweeps always run on this machine; --cluster ignored");
            }
            if let Some(repetitions) = repetitions {
                config.latency.repetitions = *repetitions;
                config.validate()?;
            }
            (latency_sweep(config.latency.repetitions, *mode), Topology::Local)
        }
    };

    run_sweep(config, topology, entries).await
}

fn load_config(args: &Args) -> Result<SweepConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Config file: {}", path.display());
            SweepConfig::load_from_file(path)?
        }
        None => SweepConfig::default(),
    };
    if let Some(root) = &args.output_root {
        config.output_root = root.clone();
    }
    // Absolute, so remote invocations resolve the same path.
    if config.output_root.is_relative() {
        config.output_root = std::env::current_dir()
            .context("Failed to resolve current directory")?
            .join(&config.output_root);
    }
    Ok(config)
}

fn throughput_topology(args: &Args, config: &SweepConfig) -> Result<Topology> {
    if args.cluster {
        Topology::cluster(&config.cluster).context("Failed to discover cluster nodes")
    } else {
        Ok(Topology::Local)
    }
}

async fn run_sweep(config: SweepConfig, topology: Topology, entries: Vec<SweepEntry>) -> Result<()> {
    let supervisor = SweepSupervisor::new(config.output_root.clone(), config.retry.policy());
    let mut driver = RunDriver::new(config, topology);

    info!("Sweep of {} scenarios into {}", entries.len(), supervisor.root().display());

    tokio::select! {
        result = supervisor.run(&entries, &mut driver) => {
            match result {
                Ok(report) => {
                    info!(
                        "Sweep finished: {} executed, {} skipped, {} failed attempts",
                        report.executed, report.skipped, report.failed_attempts
                    );
                    Ok(())
                }
                Err(e) => {
                    error!("Sweep stopped: {}", e);
                    Err(anyhow::anyhow!("Sweep failed: {}", e))
                }
            }
        }
        signal = shutdown_signal() => {
            signal?;
            // Dropping the sweep future kills in-flight children.
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}

fn run_trace(file: &Path, namespace: &str, json: bool) -> Result<()> {
    let filter = CallFilter::with_namespace(namespace);
    let report = aggregate_file(file, &filter)
        .with_context(|| format!("Failed to aggregate trace {}", file.display()))?;

    if json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C signal");
    }

    Ok(())
}
