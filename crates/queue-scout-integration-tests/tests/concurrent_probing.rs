//! Integration tests for concurrent connection handling
//!
//! These tests verify:
//! - Connects to distinct hosts proceed independently
//! - Racing connects to one host converge on a single record
//! - The bounded probe pool serializes work once saturated
//! - Probes answer without registering connections

mod common;

use common::{manager_with, standard_manager};
use queue_scout_core::{ConnectOptions, ManagerConfig};
use queue_transport::{HostSeed, InMemoryConfig, QueueSeed};
use std::time::Duration;

/// Topology for the pool tests: two one-queue hosts with injected latency
fn slow_pair() -> InMemoryConfig {
    InMemoryConfig {
        hosts: vec![
            HostSeed {
                latency_ms: Some(50),
                ..HostSeed::new("mq-01").with_queue(QueueSeed::new("orders"))
            },
            HostSeed {
                latency_ms: Some(50),
                ..HostSeed::new("mq-02").with_queue(QueueSeed::new("reports"))
            },
        ],
    }
}

/// Verify that connects to distinct hosts run concurrently and register
/// independent records
#[tokio::test]
async fn test_distinct_hosts_connect_independently() {
    let (manager, _transport) = standard_manager();

    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.connect("mq-01", ConnectOptions::default()).await }
    });
    let second = tokio::spawn({
        let manager = manager.clone();
        async move { manager.connect("mq-02", ConnectOptions::default()).await }
    });

    let first = first.await.expect("task").expect("connect mq-01");
    let second = second.await.expect("task").expect("connect mq-02");
    assert_ne!(first.id, second.id);

    let connections = manager.list_connections();
    let hosts: Vec<&str> = connections
        .iter()
        .map(|connection| connection.host.as_str())
        .collect();
    assert_eq!(hosts, vec!["mq-01", "mq-02"]);
}

/// Verify that racing connects to one host converge on a single record
#[tokio::test]
async fn test_racing_connects_share_one_record() {
    let (manager, _transport) = standard_manager();

    let (first, second) = tokio::join!(
        manager.connect("mq-01", ConnectOptions::default()),
        manager.connect("MQ-01", ConnectOptions::default()),
    );

    let first = first.expect("first connect");
    let second = second.expect("second connect");
    assert_eq!(first.id, second.id);
    assert_eq!(manager.list_connections().len(), 1);
}

/// Verify that a saturated probe pool serializes connects
///
/// Each connect makes four transport calls at 50ms injected latency. With a
/// pool of one the hosts run back to back, so the pair takes at least 400ms
/// of virtual time.
#[tokio::test(start_paused = true)]
async fn test_probe_pool_serializes_when_saturated() {
    let config = ManagerConfig {
        max_concurrent_probes: 1,
        ..ManagerConfig::default()
    };
    let (manager, _transport) = manager_with(slow_pair(), config);

    let start = tokio::time::Instant::now();
    let (first, second) = tokio::join!(
        manager.connect("mq-01", ConnectOptions::default()),
        manager.connect("mq-02", ConnectOptions::default()),
    );
    first.expect("connect mq-01");
    second.expect("connect mq-02");

    assert!(tokio::time::Instant::now() - start >= Duration::from_millis(400));
}

/// Verify that an unsaturated pool lets distinct hosts overlap their probes
#[tokio::test(start_paused = true)]
async fn test_unsaturated_pool_overlaps_probes() {
    let (manager, _transport) = manager_with(slow_pair(), ManagerConfig::default());

    let start = tokio::time::Instant::now();
    let (first, second) = tokio::join!(
        manager.connect("mq-01", ConnectOptions::default()),
        manager.connect("mq-02", ConnectOptions::default()),
    );
    first.expect("connect mq-01");
    second.expect("connect mq-02");

    // Overlapped, the pair finishes in one host's worth of latency
    let elapsed = tokio::time::Instant::now() - start;
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(400));
}

/// Verify that probes answer host information without registering connections
#[tokio::test]
async fn test_probe_leaves_registry_untouched() {
    let (manager, _transport) = standard_manager();

    let info = manager.probe("MQ-01", None, None).await.expect("probe");
    assert_eq!(info.machine_name, "mq-01");
    assert_eq!(info.service_version.as_deref(), Some("in-memory/1.0"));

    assert!(manager.list_connections().is_empty());
}
