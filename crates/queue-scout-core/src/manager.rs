//! # Connection Lifecycle
//!
//! Owns every connection's state machine. `connect` probes a host and runs a
//! discovery pass under a deadline, `refresh` re-runs discovery without
//! touching status or snapshot on failure, `disconnect` tears the entry down
//! and removes it from the registry.
//!
//! Operations against the same connection are serialized by a per-host async
//! mutex; operations against distinct hosts never contend. Outbound probes
//! across all hosts share a bounded permit pool.

use crate::address::{AddressError, CanonicalHost};
use crate::cancel::CancelToken;
use crate::classify::classify;
use crate::config::ManagerConfig;
use crate::connection::{Connection, ConnectionId, ConnectionStatus};
use crate::discovery::{DiscoveryOutcome, QueueDiscoveryService};
use crate::events::{ConnectionEvent, ConnectionEventBus};
use crate::registry::ConnectionRegistry;
use dashmap::DashMap;
use queue_transport::{Credentials, HostInfo, QueueTransport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, Semaphore, SemaphorePermit};
use tokio::time::error::Elapsed;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by connection lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The host input was rejected before any network I/O.
    #[error(transparent)]
    InvalidHost(#[from] AddressError),

    /// No connection with the given id exists.
    #[error("No connection with id {id}")]
    UnknownConnection { id: ConnectionId },

    /// A reconnect was requested but the connection has opted out.
    #[error("Automatic reconnect is disabled for this connection")]
    AutoReconnectDisabled,

    /// A reconnect was requested after the attempt budget ran out.
    #[error("Retry budget exhausted after {attempts} failed attempts")]
    RetryBudgetExhausted { attempts: u32 },

    /// The caller cancelled the operation before it settled.
    #[error("Operation cancelled")]
    Cancelled,

    /// The probe or discovery pass failed. `message` carries the classified,
    /// remediation-oriented text; `timed_out` is set when the failure was the
    /// deadline expiring.
    #[error("{message}")]
    Failed { message: String, timed_out: bool },
}

impl ConnectError {
    /// Classify a transport failure into caller-facing text
    fn from_transport(error: &TransportError) -> Self {
        Self::Failed {
            message: classify(error),
            timed_out: matches!(error, TransportError::Timeout { .. }),
        }
    }
}

// ============================================================================
// Call Options
// ============================================================================

/// Options accepted by [`ConnectionManager::connect`]
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Credentials presented to the host during the probe.
    pub credentials: Option<Credentials>,

    /// Name shown to users; defaults to the canonical host.
    pub display_name: Option<String>,

    /// Overrides the configured deadline for this call.
    pub deadline: Option<Duration>,

    /// Token checked throughout the attempt.
    pub cancel: Option<CancelToken>,
}

/// Options accepted by [`ConnectionManager::refresh`]
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Whether system queues stay in the refreshed snapshot.
    pub include_system_queues: bool,

    /// Overrides the configured deadline for this call.
    pub deadline: Option<Duration>,

    /// Token checked throughout the pass.
    pub cancel: Option<CancelToken>,
}

// ============================================================================
// Connection Manager
// ============================================================================

/// Manages connection state and serializes lifecycle operations per host
///
/// # Examples
///
/// ```
/// use queue_scout_core::config::ManagerConfig;
/// use queue_scout_core::manager::{ConnectOptions, ConnectionManager};
/// use queue_transport::{HostSeed, InMemoryConfig, InMemoryTransport, QueueSeed};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(InMemoryTransport::new(InMemoryConfig {
///     hosts: vec![HostSeed::new("mq-01").with_queue(QueueSeed::new("orders"))],
/// }));
/// let manager = ConnectionManager::new(transport, ManagerConfig::default());
///
/// let connection = manager.connect("mq-01", ConnectOptions::default()).await?;
/// assert_eq!(connection.queue_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager {
    transport: Arc<dyn QueueTransport>,
    discovery: QueueDiscoveryService,
    registry: ConnectionRegistry,
    events: ConnectionEventBus,
    config: ManagerConfig,
    probe_permits: Semaphore,
    host_locks: DashMap<CanonicalHost, Arc<Mutex<()>>>,
}

impl ConnectionManager {
    /// Create a manager over a transport
    pub fn new(transport: Arc<dyn QueueTransport>, config: ManagerConfig) -> Self {
        let discovery = QueueDiscoveryService::new(transport.clone());
        let events = ConnectionEventBus::new(config.event_buffer_size);
        let probe_permits = Semaphore::new(config.max_concurrent_probes);

        Self {
            transport,
            discovery,
            registry: ConnectionRegistry::new(),
            events,
            config,
            probe_permits,
            host_locks: DashMap::new(),
        }
    }

    /// Establish or re-establish a connection to a host
    ///
    /// The host is normalized first; a live entry for the same host is
    /// returned unchanged, so concurrent calls cannot create duplicates. A
    /// settled failed entry is retried under the same connection id, subject
    /// to its auto-reconnect flag and remaining retry budget. The probe and
    /// discovery pass run under one deadline; expiry settles the entry in
    /// `Timeout` rather than `Failed`.
    ///
    /// No retry happens inside this call. Callers drive reconnect attempts
    /// themselves, typically spaced by a
    /// [`RetryPolicy`](crate::retry::RetryPolicy).
    pub async fn connect(
        &self,
        host: &str,
        options: ConnectOptions,
    ) -> Result<Connection, ConnectError> {
        let host = CanonicalHost::normalize(host)?;
        let lock = self.host_lock(&host);
        let _guard = lock.lock().await;

        let existing = self.registry.get(&host);
        if let Some(connection) = &existing {
            if connection.is_live() {
                debug!(host = %host, connection_id = %connection.id, "Reusing live connection");
                return Ok(connection.clone());
            }
            if connection.status.can_retry() {
                if !connection.auto_reconnect {
                    return Err(ConnectError::AutoReconnectDisabled);
                }
                if connection.retry_count >= connection.max_retry_attempts {
                    return Err(ConnectError::RetryBudgetExhausted {
                        attempts: connection.retry_count,
                    });
                }
            }
        }

        let mut connection = match existing.clone() {
            Some(connection) => connection,
            None => Connection::new(
                host.clone(),
                options.display_name.clone(),
                self.config.max_retry_attempts,
                self.config.auto_reconnect,
            ),
        };

        let id = connection.id;
        let previous_status = connection.status;
        connection.begin_attempt();
        self.registry.insert(connection);
        self.publish_transition(id, previous_status, ConnectionStatus::Connecting);
        info!(host = %host, connection_id = %id, "Connection attempt started");

        let deadline = options
            .deadline
            .unwrap_or_else(|| self.config.default_deadline());
        let attempt = self
            .run_discovery(
                &host,
                options.credentials.as_ref(),
                true,
                self.config.include_system_queues,
                deadline,
                options.cancel.as_ref(),
            )
            .await;

        match attempt {
            Ok(outcome) => {
                let connected = self.settle_success(id, outcome)?;
                info!(
                    host = %host,
                    connection_id = %id,
                    queues = connected.queue_count(),
                    "Connected"
                );
                Ok(connected)
            }
            Err(ConnectError::Cancelled) => {
                self.roll_back_attempt(id, existing);
                info!(host = %host, connection_id = %id, "Connection attempt cancelled");
                Err(ConnectError::Cancelled)
            }
            Err(error) => {
                self.settle_failure(id, &error);
                warn!(host = %host, connection_id = %id, error = %error, "Connection attempt failed");
                Err(error)
            }
        }
    }

    /// Re-run discovery for an existing connection
    ///
    /// On success the snapshot is replaced wholesale and the refresh time
    /// stamped; status is never changed by a refresh. On failure or
    /// cancellation the connection keeps its status and its previously
    /// stored snapshot, and the failure is returned.
    pub async fn refresh(
        &self,
        id: ConnectionId,
        options: RefreshOptions,
    ) -> Result<Connection, ConnectError> {
        let host = self
            .registry
            .host_for(id)
            .ok_or(ConnectError::UnknownConnection { id })?;
        let lock = self.host_lock(&host);
        let _guard = lock.lock().await;

        // The entry may have been disconnected while we waited for the lock.
        if self.registry.get_by_id(id).is_none() {
            return Err(ConnectError::UnknownConnection { id });
        }

        let deadline = options
            .deadline
            .unwrap_or_else(|| self.config.default_deadline());
        let DiscoveryOutcome {
            snapshots,
            hidden_system_queues,
        } = self
            .run_discovery(
                &host,
                None,
                false,
                options.include_system_queues,
                deadline,
                options.cancel.as_ref(),
            )
            .await?;

        let refreshed = self
            .registry
            .update(id, |connection| {
                connection.apply_snapshot(snapshots, hidden_system_queues);
            })
            .ok_or(ConnectError::UnknownConnection { id })?;

        self.events.publish(ConnectionEvent::Refreshed {
            connection_id: id,
            queue_count: refreshed.queue_count(),
        });
        debug!(
            host = %host,
            connection_id = %id,
            queues = refreshed.queue_count(),
            "Snapshot refreshed"
        );
        Ok(refreshed)
    }

    /// Tear a connection down and drop it from the registry
    pub async fn disconnect(&self, id: ConnectionId) -> Result<(), ConnectError> {
        let host = self
            .registry
            .host_for(id)
            .ok_or(ConnectError::UnknownConnection { id })?;
        let lock = self.host_lock(&host);
        let _guard = lock.lock().await;

        let previous = self
            .registry
            .get_by_id(id)
            .ok_or(ConnectError::UnknownConnection { id })?;
        let previous_status = previous.status;

        self.registry
            .update(id, |connection| connection.mark_disconnected());
        self.registry.remove(id);
        self.publish_transition(id, previous_status, ConnectionStatus::Disconnected);
        info!(host = %host, connection_id = %id, "Disconnected");
        Ok(())
    }

    /// Probe a host without creating a connection
    ///
    /// Runs under the same permit pool and deadline as `connect`, classifies
    /// failures the same way, and leaves the registry untouched.
    pub async fn probe(
        &self,
        host: &str,
        credentials: Option<&Credentials>,
        deadline: Option<Duration>,
    ) -> Result<HostInfo, ConnectError> {
        let host = CanonicalHost::normalize(host)?;
        let deadline = deadline.unwrap_or_else(|| self.config.default_deadline());

        let work = async {
            let _permit = self.acquire_probe_permit().await?;
            self.transport
                .probe_host(host.as_str(), credentials)
                .await
                .map_err(|error| ConnectError::from_transport(&error))
        };

        settle_deadline(tokio::time::timeout(deadline, work).await, deadline)
    }

    /// Snapshot of every connection, ordered by host
    pub fn list_connections(&self) -> Vec<Connection> {
        self.registry.list()
    }

    /// Look up a connection by id
    pub fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        self.registry.get_by_id(id)
    }

    /// Register a subscriber for lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Run the probe and discovery sequence under permit, deadline, and token
    ///
    /// `probe_first` is set by `connect`; `refresh` goes straight to
    /// enumeration and lets it surface reachability failures itself.
    async fn run_discovery(
        &self,
        host: &CanonicalHost,
        credentials: Option<&Credentials>,
        probe_first: bool,
        include_system_queues: bool,
        deadline: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<DiscoveryOutcome, ConnectError> {
        let work = async {
            // Waiting for a permit counts against the deadline, so a saturated
            // pool surfaces as a timeout instead of an unbounded stall.
            let _permit = self.acquire_probe_permit().await?;

            if probe_first {
                self.transport
                    .probe_host(host.as_str(), credentials)
                    .await
                    .map_err(|error| ConnectError::from_transport(&error))?;
            }

            self.discovery
                .discover(host, include_system_queues)
                .await
                .map_err(|error| ConnectError::from_transport(&error))
        };
        let bounded = tokio::time::timeout(deadline, work);

        match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ConnectError::Cancelled),
                outcome = bounded => settle_deadline(outcome, deadline),
            },
            None => settle_deadline(bounded.await, deadline),
        }
    }

    /// Commit a successful attempt
    fn settle_success(
        &self,
        id: ConnectionId,
        outcome: DiscoveryOutcome,
    ) -> Result<Connection, ConnectError> {
        let DiscoveryOutcome {
            snapshots,
            hidden_system_queues,
        } = outcome;

        let connected = self
            .registry
            .update(id, |connection| {
                connection.mark_connected();
                connection.apply_snapshot(snapshots, hidden_system_queues);
            })
            .ok_or(ConnectError::UnknownConnection { id })?;

        self.publish_transition(id, ConnectionStatus::Connecting, ConnectionStatus::Connected);
        Ok(connected)
    }

    /// Commit a failed attempt
    fn settle_failure(&self, id: ConnectionId, error: &ConnectError) {
        let (message, timed_out) = match error {
            ConnectError::Failed { message, timed_out } => (message.clone(), *timed_out),
            other => (other.to_string(), false),
        };
        let status = if timed_out {
            ConnectionStatus::Timeout
        } else {
            ConnectionStatus::Failed
        };

        let failed = match self.registry.update(id, |connection| {
            connection.record_failure(status, message.clone());
        }) {
            Some(connection) => connection,
            None => return,
        };

        self.publish_transition(id, ConnectionStatus::Connecting, status);
        self.events.publish(ConnectionEvent::Failed {
            connection_id: id,
            error_message: message,
            will_retry: failed.can_attempt_reconnect(),
            retry_attempt: failed.retry_count,
        });
    }

    /// Undo the registry effects of a cancelled attempt
    ///
    /// A fresh entry is removed outright; a retried entry gets its
    /// pre-attempt record back with its retry count untouched.
    fn roll_back_attempt(&self, id: ConnectionId, previous: Option<Connection>) {
        match previous {
            Some(prior) => {
                let restored_status = prior.status;
                self.registry.insert(prior);
                self.publish_transition(id, ConnectionStatus::Connecting, restored_status);
            }
            None => {
                self.registry.remove(id);
            }
        }
    }

    fn publish_transition(
        &self,
        id: ConnectionId,
        previous_status: ConnectionStatus,
        new_status: ConnectionStatus,
    ) {
        self.events.publish(ConnectionEvent::StateChanged {
            connection_id: id,
            previous_status,
            new_status,
        });
    }

    /// Take a slot from the bounded probe pool
    ///
    /// The pool is never closed, so the error arm cannot fire.
    async fn acquire_probe_permit(&self) -> Result<SemaphorePermit<'_>, ConnectError> {
        self.probe_permits
            .acquire()
            .await
            .map_err(|_| ConnectError::Failed {
                message: "Probe pool is closed".to_string(),
                timed_out: false,
            })
    }

    /// Mutual-exclusion scope for one host
    ///
    /// Entries are created on first use and kept for the manager's lifetime,
    /// so two tasks asking for the same host always receive the same mutex.
    fn host_lock(&self, host: &CanonicalHost) -> Arc<Mutex<()>> {
        self.host_locks
            .entry(host.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}

/// Collapse a deadline expiry into a classified timeout failure
fn settle_deadline<T>(
    outcome: Result<Result<T, ConnectError>, Elapsed>,
    deadline: Duration,
) -> Result<T, ConnectError> {
    match outcome {
        Ok(result) => result,
        Err(_) => {
            let duration = chrono::Duration::milliseconds(deadline.as_millis() as i64);
            Err(ConnectError::Failed {
                message: classify(&TransportError::Timeout { duration }),
                timed_out: true,
            })
        }
    }
}
