//! Daemon instances against the fake daemon: readiness gating, service
//! discovery, teardown and startup failures.

use e2e_tests::{fake_tor_settings, init_logging};
use onionsweep_common::Error;
use onionsweep_process::process_exists;
use onionsweep_tor::{
    close_all, spawn_batch, DirectoryDiscovery, InstanceRequest, InstanceState, ServiceInstance,
};
use std::time::Duration;

#[tokio::test]
async fn test_instance_ready_then_closed() {
    init_logging();
    let settings = fake_tor_settings(&["--step-ms", "20"], Duration::from_secs(10));

    let mut instance = ServiceInstance::spawn(&settings, InstanceRequest::service("deaddrop-0", 9100, 80, 5100))
        .await
        .unwrap();

    assert_eq!(instance.state(), InstanceState::Ready);
    let endpoint = instance.endpoint(80).expect("service on port 80");
    assert_eq!(endpoint.local_port, 5100);
    assert_eq!(endpoint.address, "service805100fake.onion");
    assert_eq!(endpoint.local_listen_address(), "127.0.0.1:5100");

    let pid = instance.pid().expect("daemon pid");
    let directory = instance.directory().to_path_buf();
    assert!(directory.join("torrc").is_file());

    instance.close().await.unwrap();
    assert_eq!(instance.state(), InstanceState::Closed);
    assert!(!directory.exists());
    assert!(!process_exists(pid).unwrap());

    // Closing again is a no-op.
    instance.close().await.unwrap();
    assert_eq!(instance.state(), InstanceState::Closed);
}

#[tokio::test]
async fn test_client_instance_has_no_endpoints() {
    init_logging();
    let settings = fake_tor_settings(&[], Duration::from_secs(10));

    let mut instance = ServiceInstance::spawn(&settings, InstanceRequest::client("client", 9101))
        .await
        .unwrap();
    assert!(instance.endpoints().is_empty());
    assert_eq!(instance.socks_address(), "127.0.0.1:9101");
    instance.close().await.unwrap();
}

#[tokio::test]
async fn test_exit_before_ready_reports_exit_code() {
    init_logging();
    let settings = fake_tor_settings(&["--exit-early", "7"], Duration::from_secs(10));

    let err = ServiceInstance::spawn(&settings, InstanceRequest::client("client", 9102))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ProcessExited { exit_code: Some(7), .. }), "{:?}", err);
    assert!(err.is_startup_failure());
}

#[tokio::test]
async fn test_missing_hostname_is_discovery_failure() {
    init_logging();
    let settings = fake_tor_settings(&["--skip-hostname"], Duration::from_secs(10));

    let err = ServiceInstance::spawn(&settings, InstanceRequest::service("deaddrop-0", 9103, 80, 5103))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Discovery { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_batch_stalls_until_shared_deadline() {
    init_logging();
    let settings = fake_tor_settings(&["--never-ready"], Duration::from_millis(500));
    let requests = vec![
        InstanceRequest::service("deaddrop-0", 9110, 80, 5110),
        InstanceRequest::client("client", 9111),
    ];

    let started = tokio::time::Instant::now();
    let err = spawn_batch(&settings, requests, &DirectoryDiscovery).await.unwrap_err();

    assert!(matches!(err, Error::StartupTimeout { .. }), "{:?}", err);
    assert!(err.is_startup_failure());
    // One deadline for the whole batch, not one per instance.
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_batch_ready_in_request_order() {
    init_logging();
    let settings = fake_tor_settings(&["--step-ms", "10"], Duration::from_secs(10));
    let requests = vec![
        InstanceRequest::service("deaddrop-0", 9120, 80, 5120),
        InstanceRequest::service("deaddrop-1", 9121, 80, 5121),
        InstanceRequest::client("client", 9122),
    ];

    let mut instances = spawn_batch(&settings, requests, &DirectoryDiscovery).await.unwrap();
    let names: Vec<&str> = instances.iter().map(|i| i.name()).collect();
    assert_eq!(names, ["deaddrop-0", "deaddrop-1", "client"]);
    assert!(instances.iter().all(|i| i.state() == InstanceState::Ready));

    let directories: Vec<_> = instances.iter().map(|i| i.directory().to_path_buf()).collect();
    close_all(&mut instances).await;
    assert!(directories.iter().all(|dir| !dir.exists()));
}
