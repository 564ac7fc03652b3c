//! Whole sweeps through the supervisor: resume from existing output and
//! retry of failing scenarios.

use e2e_tests::assertions::run_count;
use e2e_tests::{init_logging, sweep_config, with_anonycast_flags};
use onionsweep_common::Error;
use onionsweep_driver::{RetryPolicy, RunDriver, SweepSupervisor, Topology};
use onionsweep_scenario::{PublishConfig, SweepEntry};
use std::fs;
use std::time::Duration;

fn publish_entries() -> Vec<SweepEntry> {
    [(1, 128), (2, 128), (1, 256)]
        .into_iter()
        .map(|(clients, message_size)| {
            SweepEntry::new(
                "publish",
                PublishConfig {
                    clients,
                    message_size,
                },
            )
        })
        .collect()
}

#[tokio::test]
async fn test_sweep_resumes_from_existing_output() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let entries = publish_entries();

    let done = entries[0].output_path(dir.path());
    fs::create_dir_all(done.parent().unwrap()).unwrap();
    fs::write(&done, "previous result").unwrap();

    let mut config = sweep_config(dir.path());
    config.measurement.deaddrop_port = 5400;
    let mut driver = RunDriver::new(config, Topology::Local);
    let supervisor = SweepSupervisor::new(dir.path(), RetryPolicy::bounded(1));

    let report = supervisor.run(&entries, &mut driver).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.executed, 2);
    assert_eq!(fs::read_to_string(&done).unwrap(), "previous result");
    assert!(entries.iter().all(|e| e.output_path(dir.path()).is_file()));

    let report = supervisor.run(&entries, &mut driver).await.unwrap();
    assert_eq!(report.skipped, 3);
    assert_eq!(report.executed, 0);
}

#[tokio::test]
async fn test_failing_scenario_retried_until_success() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("runs");
    let state_arg = state.to_string_lossy().into_owned();

    let mut config = sweep_config(dir.path());
    config.measurement.deaddrop_port = 5401;
    with_anonycast_flags(&mut config, &["--fail-first", "2", "--state-file", &state_arg]);
    let mut driver = RunDriver::new(config, Topology::Local);

    let entries = &publish_entries()[..1];
    let report = SweepSupervisor::new(dir.path(), RetryPolicy::bounded(3))
        .run(entries, &mut driver)
        .await
        .unwrap();

    assert_eq!(report.executed, 1);
    assert_eq!(report.failed_attempts, 2);
    assert_eq!(run_count(&state), 3);
    assert!(entries[0].output_path(dir.path()).is_file());
}

#[tokio::test]
async fn test_bounded_policy_stops_sweep() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.measurement.deaddrop_port = 5402;
    with_anonycast_flags(&mut config, &["--exit-code", "1"]);
    let mut driver = RunDriver::new(config, Topology::Local);

    let entries = publish_entries();
    let err = SweepSupervisor::new(dir.path(), RetryPolicy::bounded(2))
        .run(&entries, &mut driver)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 2, .. }), "{:?}", err);
    // Later scenarios never started.
    assert!(!entries[1].output_path(dir.path()).exists());
}

#[tokio::test]
async fn test_unbounded_policy_keeps_retrying() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("runs");
    let state_arg = state.to_string_lossy().into_owned();

    let mut config = sweep_config(dir.path());
    config.measurement.deaddrop_port = 5403;
    with_anonycast_flags(&mut config, &["--exit-code", "1", "--state-file", &state_arg]);
    let mut driver = RunDriver::new(config, Topology::Local);

    let policy = RetryPolicy {
        delay: Duration::from_millis(20),
        ..RetryPolicy::unbounded()
    };
    let supervisor = SweepSupervisor::new(dir.path(), policy);
    let entries = publish_entries();
    let outcome = tokio::time::timeout(Duration::from_secs(3), supervisor.run(&entries, &mut driver)).await;

    assert!(outcome.is_err(), "sweep should still be retrying: {:?}", outcome);
    assert!(run_count(&state) >= 2);
    assert!(!entries[0].output_path(dir.path()).exists());
}
