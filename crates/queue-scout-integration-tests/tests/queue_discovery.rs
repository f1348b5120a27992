//! Integration tests for queue discovery
//!
//! These tests verify:
//! - Snapshot contents: addresses, counts, categories, and ordering
//! - System-queue filtering and the hidden-queue counter
//! - Degraded snapshots for denied queues and journals
//! - Refreshes tracking topology changes on the host

mod common;

use common::{manager_with, standard_manager, standard_topology};
use queue_scout_core::{
    ConnectError, ConnectOptions, ConnectionStatus, ManagerConfig, QueueCategory, RefreshOptions,
};
use queue_transport::{HostSeed, InMemoryConfig, QueueSeed};

/// Verify that a snapshot carries the addresses and counts read from the host
#[tokio::test]
async fn test_snapshot_captures_addresses_and_counts() {
    let (manager, _transport) = standard_manager();
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    // Snapshots are ordered by queue name
    assert_eq!(connection.queues[0].name, "billing");

    let orders = &connection.queues[1];
    assert_eq!(orders.name, "orders");
    assert_eq!(orders.path, "mq-01\\private$\\orders");
    assert_eq!(orders.format_name, "DIRECT=OS:mq-01\\private$\\orders");
    assert_eq!(
        orders.journal_address,
        "DIRECT=OS:mq-01\\private$\\orders;JOURNAL"
    );
    assert_eq!(orders.message_count, 3);
    assert_eq!(orders.journal_message_count, 1);
    assert!(orders.accessible);
    assert_eq!(orders.error, None);
    assert_eq!(orders.category, QueueCategory::Private);
}

/// Verify that system queues are hidden by default and counted
#[tokio::test]
async fn test_system_queues_hidden_by_default() {
    let (manager, _transport) = standard_manager();
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    assert_eq!(connection.queue_count(), 2);
    assert_eq!(connection.hidden_system_queues, 1);
    assert!(connection
        .queues
        .iter()
        .all(|queue| queue.category != QueueCategory::System));
}

/// Verify that discovery includes system queues when configured to
#[tokio::test]
async fn test_include_system_queues_reveals_them() {
    let config = ManagerConfig {
        include_system_queues: true,
        ..ManagerConfig::default()
    };
    let (manager, _transport) = manager_with(standard_topology(), config);
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    assert_eq!(connection.queue_count(), 3);
    assert_eq!(connection.hidden_system_queues, 0);

    let admin = connection
        .queues
        .iter()
        .find(|queue| queue.name == "admin_queue$")
        .expect("system queue in snapshot");
    assert_eq!(admin.category, QueueCategory::System);
}

/// Verify that a refresh can opt into system queues per call
#[tokio::test]
async fn test_refresh_opts_into_system_queues() {
    let (manager, _transport) = standard_manager();
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");
    assert_eq!(connection.queue_count(), 2);

    let refreshed = manager
        .refresh(
            connection.id,
            RefreshOptions {
                include_system_queues: true,
                ..RefreshOptions::default()
            },
        )
        .await
        .expect("refresh");

    assert_eq!(refreshed.queue_count(), 3);
    assert_eq!(refreshed.hidden_system_queues, 0);
}

/// Verify that a denied queue degrades its snapshot instead of failing the
/// pass
#[tokio::test]
async fn test_denied_queue_degrades_snapshot() {
    let topology = InMemoryConfig {
        hosts: vec![HostSeed::new("mq-01")
            .with_queue(QueueSeed::new("orders").with_messages(3))
            .with_queue(QueueSeed {
                deny_access: true,
                ..QueueSeed::new("payroll")
            })],
    };
    let (manager, _transport) = manager_with(topology, ManagerConfig::default());
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    assert_eq!(connection.queue_count(), 2);

    let payroll = connection
        .queues
        .iter()
        .find(|queue| queue.name == "payroll")
        .expect("denied queue still present");
    assert!(!payroll.accessible);
    assert_eq!(payroll.message_count, 0);
    let error = payroll.error.as_deref().expect("classified error text");
    assert!(error.contains("was denied"));

    let orders = connection
        .queues
        .iter()
        .find(|queue| queue.name == "orders")
        .expect("healthy queue");
    assert!(orders.accessible);
    assert_eq!(orders.message_count, 3);
}

/// Verify that a denied journal zeroes the count without degrading the queue
#[tokio::test]
async fn test_denied_journal_keeps_queue_healthy() {
    let topology = InMemoryConfig {
        hosts: vec![HostSeed::new("mq-01").with_queue(QueueSeed {
            deny_journal_access: true,
            ..QueueSeed::new("orders")
                .with_messages(2)
                .with_journal_messages(4)
        })],
    };
    let (manager, _transport) = manager_with(topology, ManagerConfig::default());
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    let orders = &connection.queues[0];
    assert!(orders.accessible);
    assert_eq!(orders.message_count, 2);
    assert_eq!(orders.journal_message_count, 0);
    assert_eq!(orders.error, None);
}

/// Verify that refreshes track queues added to and removed from the host
#[tokio::test]
async fn test_refresh_tracks_topology_changes() {
    let (manager, transport) = standard_manager();
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");
    assert_eq!(connection.queue_count(), 2);

    assert!(transport.add_queue("mq-01", QueueSeed::new("returns").with_messages(1)));
    assert!(transport.remove_queue("mq-01", "billing"));

    let refreshed = manager
        .refresh(connection.id, RefreshOptions::default())
        .await
        .expect("refresh");
    let names: Vec<&str> = refreshed
        .queues
        .iter()
        .map(|queue| queue.name.as_str())
        .collect();
    assert_eq!(names, vec!["orders", "returns"]);
}

/// Verify that a failed refresh keeps the previous status and snapshot
#[tokio::test]
async fn test_failed_refresh_preserves_snapshot() {
    let (manager, transport) = standard_manager();
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    assert!(transport.set_host_online("mq-01", false));
    let error = manager
        .refresh(connection.id, RefreshOptions::default())
        .await
        .expect_err("host went offline");
    assert!(matches!(error, ConnectError::Failed { .. }));

    let kept = manager.get_connection(connection.id).expect("record kept");
    assert_eq!(kept.status, ConnectionStatus::Connected);
    assert_eq!(kept.queues, connection.queues);
    assert_eq!(kept.last_refreshed_at, connection.last_refreshed_at);
}
