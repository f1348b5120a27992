//! Integration tests for the connection lifecycle
//!
//! These tests verify:
//! - The full connect, refresh, disconnect round trip against a seeded host
//! - Idempotent connects across host spellings
//! - Reconnect behavior under the retry budget and the auto-reconnect flag
//! - Registry bookkeeping after disconnects

mod common;

use common::{manager_with, standard_manager, standard_topology};
use queue_scout_core::{
    ConnectError, ConnectOptions, Connection, ConnectionId, ConnectionStatus, ManagerConfig,
    RefreshOptions,
};
use queue_transport::QueueSeed;

/// Verify that connect, refresh, and disconnect drive one record through its
/// full lifecycle
#[tokio::test]
async fn test_connect_refresh_disconnect_round_trip() {
    let (manager, transport) = standard_manager();

    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");
    assert_eq!(connection.status, ConnectionStatus::Connected);
    assert_eq!(connection.queue_count(), 2);
    assert_eq!(connection.hidden_system_queues, 1);
    assert!(connection.connected_at.is_some());

    // The host grows a queue while the connection is live
    assert!(transport.add_queue("mq-01", QueueSeed::new("returns")));

    let refreshed = manager
        .refresh(connection.id, RefreshOptions::default())
        .await
        .expect("refresh");
    assert_eq!(refreshed.status, ConnectionStatus::Connected);
    assert_eq!(refreshed.queue_count(), 3);
    assert!(refreshed.last_refreshed_at.is_some());

    manager.disconnect(connection.id).await.expect("disconnect");
    assert!(manager.get_connection(connection.id).is_none());
    assert!(manager.list_connections().is_empty());
}

/// Verify that a second connect to a live host returns the existing record
#[tokio::test]
async fn test_connect_reuses_live_connection_across_spellings() {
    let (manager, _transport) = standard_manager();

    let first = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("first connect");
    let second = manager
        .connect("  MQ-01  ", ConnectOptions::default())
        .await
        .expect("second connect");

    assert_eq!(first.id, second.id);
    assert_eq!(manager.list_connections().len(), 1);
}

/// Verify that a reconnect after a failure keeps the connection id and resets
/// the retry budget on success
#[tokio::test]
async fn test_reconnect_after_failure_keeps_connection_id() {
    let (manager, transport) = standard_manager();
    assert!(transport.set_host_online("mq-01", false));

    let error = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect_err("host is offline");
    assert!(matches!(
        error,
        ConnectError::Failed {
            timed_out: false,
            ..
        }
    ));

    let failed = &manager.list_connections()[0];
    assert_eq!(failed.status, ConnectionStatus::Failed);
    assert_eq!(failed.retry_count, 1);
    assert!(failed.last_error.is_some());
    let failed_id = failed.id;

    assert!(transport.set_host_online("mq-01", true));
    let recovered = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("reconnect");

    assert_eq!(recovered.id, failed_id);
    assert_eq!(recovered.status, ConnectionStatus::Connected);
    assert_eq!(recovered.retry_count, 0);
    assert!(recovered.last_error.is_none());
}

/// Verify that reconnect attempts are refused once the retry budget is spent
#[tokio::test]
async fn test_retry_budget_exhaustion_rejects_reconnects() {
    let config = ManagerConfig {
        max_retry_attempts: 1,
        ..ManagerConfig::default()
    };
    let (manager, transport) = manager_with(standard_topology(), config);
    assert!(transport.set_host_online("mq-01", false));

    manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect_err("host is offline");

    let error = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect_err("budget is spent");
    assert_eq!(error, ConnectError::RetryBudgetExhausted { attempts: 1 });
}

/// Verify that a connection created with auto-reconnect disabled refuses
/// retries outright
#[tokio::test]
async fn test_auto_reconnect_disabled_rejects_retry() {
    let config = ManagerConfig {
        auto_reconnect: false,
        ..ManagerConfig::default()
    };
    let (manager, transport) = manager_with(standard_topology(), config);
    assert!(transport.set_host_online("mq-01", false));

    manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect_err("host is offline");
    assert!(transport.set_host_online("mq-01", true));

    let error = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect_err("auto-reconnect is off");
    assert_eq!(error, ConnectError::AutoReconnectDisabled);
}

/// Verify that a disconnected host gets a fresh record on the next connect
#[tokio::test]
async fn test_disconnect_then_connect_creates_fresh_record() {
    let (manager, _transport) = standard_manager();

    let first = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");
    manager.disconnect(first.id).await.expect("disconnect");

    let second = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("reconnect");
    assert_ne!(first.id, second.id);
    assert_eq!(manager.list_connections().len(), 1);
}

/// Verify that the display name defaults to the canonical host and honors an
/// explicit override
#[tokio::test]
async fn test_display_name_defaults_and_overrides() {
    let (manager, _transport) = standard_manager();

    let defaulted = manager
        .connect("MQ-01", ConnectOptions::default())
        .await
        .expect("connect");
    assert_eq!(defaulted.display_name, "mq-01");

    let named = manager
        .connect(
            "mq-02",
            ConnectOptions {
                display_name: Some("Reporting host".to_string()),
                ..ConnectOptions::default()
            },
        )
        .await
        .expect("connect");
    assert_eq!(named.display_name, "Reporting host");
}

/// Verify that operations on unknown connection ids are rejected
#[tokio::test]
async fn test_unknown_connection_ids_are_rejected() {
    let (manager, _transport) = standard_manager();
    let id = ConnectionId::new();

    let refresh_error = manager
        .refresh(id, RefreshOptions::default())
        .await
        .expect_err("never connected");
    assert_eq!(refresh_error, ConnectError::UnknownConnection { id });

    let disconnect_error = manager.disconnect(id).await.expect_err("never connected");
    assert_eq!(disconnect_error, ConnectError::UnknownConnection { id });
}

/// Verify that a live connection record serializes losslessly for external
/// tooling
#[tokio::test]
async fn test_connection_record_serializes_losslessly() {
    let (manager, _transport) = standard_manager();
    let connection = manager
        .connect("mq-01", ConnectOptions::default())
        .await
        .expect("connect");

    let encoded = serde_json::to_string(&connection).expect("serialize");
    let decoded: Connection = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(connection, decoded);
}
