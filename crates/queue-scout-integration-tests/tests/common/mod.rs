//! Common test utilities for queue-scout integration tests
//!
//! This module provides:
//! - A standard seeded topology shared by the scenario tests
//! - Manager constructors wired to an in-memory transport
//! - A helper for draining buffered lifecycle events

use queue_scout_core::{ConnectionEvent, ConnectionManager, ManagerConfig};
use queue_transport::{HostSeed, InMemoryConfig, InMemoryTransport, QueueSeed};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Topology used by most scenarios: two healthy hosts and one offline host
///
/// - `mq-01`: `orders` (3 messages, 1 journal entry), `billing` (empty), and
///   the system queue `admin_queue$`
/// - `mq-02`: `reports` (5 messages)
/// - `mq-down`: seeded but unreachable
#[allow(dead_code)]
pub fn standard_topology() -> InMemoryConfig {
    InMemoryConfig {
        hosts: vec![
            HostSeed::new("mq-01")
                .with_queue(
                    QueueSeed::new("orders")
                        .with_messages(3)
                        .with_journal_messages(1),
                )
                .with_queue(QueueSeed::new("billing"))
                .with_queue(QueueSeed {
                    system: true,
                    ..QueueSeed::new("admin_queue$")
                }),
            HostSeed::new("mq-02").with_queue(QueueSeed::new("reports").with_messages(5)),
            HostSeed {
                online: false,
                ..HostSeed::new("mq-down")
            },
        ],
    }
}

/// Create a manager over the standard topology with default configuration
#[allow(dead_code)]
pub fn standard_manager() -> (Arc<ConnectionManager>, Arc<InMemoryTransport>) {
    manager_with(standard_topology(), ManagerConfig::default())
}

/// Create a manager over an arbitrary topology and configuration
///
/// The transport handle is returned alongside the manager so tests can mutate
/// the simulated network while connections are live.
#[allow(dead_code)]
pub fn manager_with(
    topology: InMemoryConfig,
    config: ManagerConfig,
) -> (Arc<ConnectionManager>, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new(topology));
    let manager = Arc::new(ConnectionManager::new(transport.clone(), config));
    (manager, transport)
}

/// Drain every event already buffered on a subscription
#[allow(dead_code)]
pub fn drain_events(receiver: &mut broadcast::Receiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
