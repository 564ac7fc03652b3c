// E2E test framework for onionsweep

pub mod assertions;

use onionsweep_driver::SweepConfig;
use onionsweep_tor::TorSettings;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

/// Get the path to the TESTEXE (testexe) binary
pub fn get_testexe_path() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("testexe");

    if !path.exists() {
        panic!("TESTEXE binary not found at: {}", path.display());
    }
    path
}

/// Route driver logs to the test output once per test binary.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_target(false)
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .try_init();
    });
}

/// Daemon settings running `testexe tor <extra> -f <torrc>`.
pub fn fake_tor_settings(extra: &[&str], startup_timeout: Duration) -> TorSettings {
    let mut settings = TorSettings::default();
    settings.command = onionsweep_process::CommandSpec::new(get_testexe_path().to_string_lossy())
        .with_args(std::iter::once("tor").chain(extra.iter().copied()));
    settings.startup_timeout = startup_timeout;
    settings
}

/// Sweep configuration wired to the fake binaries, writing under `root`.
///
/// Stale cleanup targets names no real process has, so parallel tests and
/// the host's own daemons are left alone.
pub fn sweep_config(root: &Path) -> SweepConfig {
    let testexe = get_testexe_path().to_string_lossy().into_owned();
    let mut config = SweepConfig::default();
    config.output_root = root.to_path_buf();

    config.tor.program = testexe.clone();
    config.tor.args = vec!["tor".to_string()];
    config.tor.startup_timeout = Duration::from_secs(10);
    config.tor.process_name = "onionsweep-e2e-no-tor".to_string();

    config.measurement.program = testexe;
    config.measurement.args = vec!["anonycast".to_string()];
    config.measurement.process_name = "onionsweep-e2e-no-anonycast".to_string();
    config.measurement.timeout = Duration::from_secs(10);
    config.measurement.server_grace = Duration::from_millis(50);

    config.latency.stale_cleanup_grace = Duration::ZERO;
    config.retry.delay = Duration::from_millis(20);
    config
}

/// Insert flags for the fake measurement binary ahead of the role arguments.
pub fn with_anonycast_flags(config: &mut SweepConfig, flags: &[&str]) {
    config
        .measurement
        .args
        .extend(flags.iter().map(|flag| flag.to_string()));
}

/// Insert flags for the fake daemon ahead of the `-f <torrc>` argument.
pub fn with_tor_flags(config: &mut SweepConfig, flags: &[&str]) {
    config.tor.args.extend(flags.iter().map(|flag| flag.to_string()));
}
