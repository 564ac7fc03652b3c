//! Single scenarios through the run driver, with fake daemon and fake
//! measurement binary.

use e2e_tests::assertions::{
    assert_daemons_torn_down, assert_flag, flag_values, recorded_args, run_count,
};
use e2e_tests::{init_logging, sweep_config, with_anonycast_flags, with_tor_flags};
use onionsweep_common::Error;
use onionsweep_driver::{RunDriver, Topology};
use onionsweep_scenario::{
    AccessMode, LatencyConfig, PublishConfig, RetrieveConfig, SweepEntry,
};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn latency_entry(deaddrops: u32) -> SweepEntry {
    SweepEntry::new(
        "latency0",
        LatencyConfig {
            mode: AccessMode::ReceiverRestricted,
            deaddrops,
            allowed_receivers: 8,
            allowed_senders: 0,
            difficulty: 12,
        },
    )
}

/// Directory the fake daemons record their pids in.
fn pid_dir(root: &Path) -> String {
    let dir = root.join("pids");
    fs::create_dir_all(&dir).unwrap();
    dir.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_latency_run_passes_discovered_services() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.tor.socks_base_port = 9200;
    config.tor.deaddrop_base_port = 5200;
    let pids = pid_dir(dir.path());
    with_tor_flags(&mut config, &["--pid-dir", &pids]);
    let driver = RunDriver::new(config, Topology::Local);

    let entry = latency_entry(2);
    let output = entry.output_path(dir.path());
    driver.run_entry(&entry, &output).await.unwrap();

    let args = recorded_args(&output).unwrap();
    assert_eq!(&args[..3], ["benchmark", "latency", "--deaddrops"]);
    assert_eq!(
        flag_values(&args, "--deaddrop-onion-address"),
        ["service805200fake.onion", "service805201fake.onion"]
    );
    assert_eq!(
        flag_values(&args, "--deaddrop-listen-address"),
        ["127.0.0.1:5200", "127.0.0.1:5201"]
    );
    assert_flag(&args, "--client-tor-proxy", "127.0.0.1:9202").unwrap();
    assert_flag(&args, "--mode", "receiver-restricted").unwrap();
    assert_flag(&args, "--allowed-receivers", "8").unwrap();
    assert_flag(&args, "--acceptance-window", "100").unwrap();

    // Two deaddrops plus the client.
    assert_eq!(assert_daemons_torn_down(Path::new(&pids)).unwrap(), 3);
}

#[tokio::test]
async fn test_latency_run_surfaces_measurement_failure() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.tor.socks_base_port = 9210;
    config.tor.deaddrop_base_port = 5210;
    let pids = pid_dir(dir.path());
    with_tor_flags(&mut config, &["--pid-dir", &pids]);
    with_anonycast_flags(&mut config, &["--exit-code", "5"]);
    let driver = RunDriver::new(config, Topology::Local);

    let entry = latency_entry(1);
    let output = entry.output_path(dir.path());
    let err = driver.run_entry(&entry, &output).await.unwrap_err();

    assert!(matches!(err, Error::MeasurementFailed { exit_code: Some(5), .. }), "{:?}", err);
    assert!(!output.exists());
    assert_eq!(assert_daemons_torn_down(Path::new(&pids)).unwrap(), 2);
}

#[tokio::test]
async fn test_latency_run_reacquires_daemons_after_startup_failure() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("launches");
    let state_arg = state.to_string_lossy().into_owned();

    let mut config = sweep_config(dir.path());
    config.tor.socks_base_port = 9220;
    config.tor.deaddrop_base_port = 5220;
    let pids = pid_dir(dir.path());
    with_tor_flags(
        &mut config,
        &["--exit-early-first", "2", "--state-file", &state_arg, "--pid-dir", &pids],
    );
    let driver = RunDriver::new(config, Topology::Local);

    let entry = latency_entry(1);
    let output = entry.output_path(dir.path());
    driver.run_entry(&entry, &output).await.unwrap();

    let args = recorded_args(&output).unwrap();
    assert_eq!(flag_values(&args, "--deaddrop-onion-address"), ["service805220fake.onion"]);
    // Two launches exited early, then a full batch of two came up.
    assert!(run_count(&state) >= 4, "launches: {}", run_count(&state));
    assert!(assert_daemons_torn_down(Path::new(&pids)).unwrap() >= 4);
}

#[tokio::test]
async fn test_latency_run_gives_up_on_stuck_daemons_when_capped() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.tor.args.push("--never-ready".to_string());
    config.tor.startup_timeout = Duration::from_millis(300);
    config.latency.max_acquisition_attempts = Some(2);
    let driver = RunDriver::new(config, Topology::Local);

    let entry = latency_entry(1);
    let err = driver
        .run_entry(&entry, &entry.output_path(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), Error::StartupTimeout { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_local_publish_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.measurement.deaddrop_port = 5300;
    let driver = RunDriver::new(config, Topology::Local);

    let entry = SweepEntry::new(
        "publish",
        PublishConfig {
            clients: 2,
            message_size: 256,
        },
    );
    let output = entry.output_path(dir.path());
    assert!(output.ends_with("publish/c2_ms256.json"));
    driver.run_entry(&entry, &output).await.unwrap();

    let args = recorded_args(&output).unwrap();
    assert_eq!(&args[..2], ["benchmark", "publish-troughput"]);
    assert_flag(&args, "--deaddrop-address", "127.0.0.1:5300").unwrap();
    assert_flag(&args, "--clients", "2").unwrap();
    assert_flag(&args, "--acceptance-window", "4294967296").unwrap();
}

#[tokio::test]
async fn test_local_retrieve_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.measurement.deaddrop_port = 5301;
    let driver = RunDriver::new(config, Topology::Local);

    let entry = SweepEntry::new(
        "retreive",
        RetrieveConfig {
            clients: 3,
            message_count: 10,
            message_size: 128,
        },
    );
    let output = entry.output_path(dir.path());
    driver.run_entry(&entry, &output).await.unwrap();

    let args = recorded_args(&output).unwrap();
    assert_eq!(&args[..2], ["benchmark", "retreive-troughput"]);
    assert_flag(&args, "--message-count", "10").unwrap();
    assert_flag(&args, "--acceptance-window", "100").unwrap();
}

#[tokio::test]
async fn test_overrunning_benchmark_times_out() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.measurement.timeout = Duration::from_millis(300);
    with_anonycast_flags(&mut config, &["--sleep-ms", "30000"]);
    let driver = RunDriver::new(config, Topology::Local);

    let entry = SweepEntry::new(
        "publish",
        PublishConfig {
            clients: 1,
            message_size: 128,
        },
    );
    let started = tokio::time::Instant::now();
    let err = driver
        .run_entry(&entry, &entry.output_path(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MeasurementTimeout { .. }), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(10));
}
