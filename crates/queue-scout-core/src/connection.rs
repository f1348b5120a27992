//! # Connection Model
//!
//! Domain types for a session with one queue host: the connection record,
//! its lifecycle status, and the per-queue snapshots produced by discovery.
//!
//! # Lifecycle States
//!
//! - **NotConnected**: record exists but no attempt has started
//! - **Connecting**: a probe or discovery pass is in flight
//! - **Connected**: probe and discovery succeeded, snapshot is current
//! - **Failed**: the last attempt failed before its deadline
//! - **Timeout**: the last attempt was abandoned at its deadline
//! - **Disconnected**: torn down by an explicit call
//!
//! Transitions are checked through [`ConnectionStatus::can_transition_to`];
//! the lifecycle manager is the only mutator of live records.

use crate::address::CanonicalHost;
use queue_transport::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;

// ============================================================================
// Identifiers
// ============================================================================

/// Errors from parsing identifiers supplied as text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

/// Unique identifier for a connection
///
/// Uses ULID for lexicographic sorting and global uniqueness. Assigned once
/// when the record is created and immutable afterwards; a reconnected host
/// keeps its id, a removed and re-added host gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    /// Generate a new unique connection ID
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Get string representation of connection ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = s.parse::<Ulid>().map_err(|_| ParseError::InvalidFormat {
            expected: "ULID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(ulid))
    }
}

// ============================================================================
// Connection Status
// ============================================================================

/// Lifecycle state of a connection
///
/// `Connected` and `Disconnected` are the only states from which no further
/// automatic action is taken without an explicit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Record exists but no attempt has started yet.
    NotConnected,

    /// A probe or discovery pass is in flight.
    Connecting,

    /// The host answered and the queue snapshot is current.
    Connected,

    /// The last attempt failed before its deadline expired.
    Failed,

    /// The last attempt was abandoned when its deadline expired.
    ///
    /// Kept separate from [`Failed`](Self::Failed) so callers can tell a dead
    /// host from a slow one.
    Timeout,

    /// Torn down by an explicit disconnect.
    Disconnected,
}

impl ConnectionStatus {
    /// Check whether the state machine permits a transition
    ///
    /// Legal transitions:
    ///
    /// - `NotConnected -> Connecting`
    /// - `Connecting -> Connected | Failed | Timeout`
    /// - `Failed | Timeout | Disconnected -> Connecting` (retry)
    /// - any state except `Disconnected` itself `-> Disconnected` (teardown)
    pub fn can_transition_to(&self, next: ConnectionStatus) -> bool {
        match (*self, next) {
            (
                Self::NotConnected | Self::Failed | Self::Timeout | Self::Disconnected,
                Self::Connecting,
            ) => true,
            (Self::Connecting, Self::Connected | Self::Failed | Self::Timeout) => true,
            (Self::Disconnected, Self::Disconnected) => false,
            (_, Self::Disconnected) => true,
            _ => false,
        }
    }

    /// Check if an attempt is in flight or has succeeded
    ///
    /// Live entries are returned unchanged by repeated `connect()` calls.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Check if the last attempt ended unsuccessfully
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }

    /// Check if a new attempt may be started from this state
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Failed | Self::Timeout | Self::Disconnected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotConnected => "not connected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Timeout => "timed out",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{}", label)
    }
}

// ============================================================================
// Queue Classification
// ============================================================================

/// Category of a discovered queue
///
/// Modeled as a closed variant so per-category branching is an exhaustive
/// match at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueCategory {
    /// User-created private queue.
    Private,

    /// Directory-registered public queue, addressed by GUID format name.
    Public,

    /// Queue the host manages for its own bookkeeping.
    System,

    /// Companion destination holding copies of messages removed from its
    /// parent queue.
    Journal,
}

impl QueueCategory {
    /// Classify a queue from the flags enumeration reports for it
    pub fn from_discovery(is_system: bool, is_journal: bool) -> Self {
        match (is_journal, is_system) {
            (true, _) => Self::Journal,
            (false, true) => Self::System,
            (false, false) => Self::Private,
        }
    }

    /// Check if this is a queue the host manages for itself
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }

    /// Check if this is a journal destination
    pub fn is_journal(&self) -> bool {
        matches!(self, Self::Journal)
    }
}

impl fmt::Display for QueueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::System => "system",
            Self::Journal => "journal",
        };
        write!(f, "{}", label)
    }
}

// ============================================================================
// Queue Snapshot
// ============================================================================

/// Point-in-time description of one discovered queue
///
/// Created fresh on each discovery pass; a pass replaces the whole snapshot
/// list or none of it. The journal address is derived from the queue's own
/// addresses and does not depend on whether the journal exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Bare queue name without path decoration.
    pub name: String,

    /// Hierarchical path, e.g. `mq-host\private$\orders`.
    pub path: String,

    /// Direct format name for the queue.
    pub format_name: String,

    /// Derived address of the companion journal.
    pub journal_address: String,

    /// Messages waiting in the queue at snapshot time.
    pub message_count: u64,

    /// Messages in the companion journal; zero when the count could not be
    /// read.
    pub journal_message_count: u64,

    /// Whether the queue itself could be read.
    pub accessible: bool,

    /// Classified failure text when the queue could not be read.
    pub error: Option<String>,

    /// Category assigned during discovery.
    pub category: QueueCategory,
}

// ============================================================================
// Connection
// ============================================================================

/// A session with one queue host
///
/// At most one connection exists per normalized host; the registry enforces
/// the invariant. All mutation goes through the lifecycle manager, which
/// serializes operations per connection id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique, immutable identifier.
    pub id: ConnectionId,

    /// Normalized host the session targets.
    pub host: CanonicalHost,

    /// Name shown to users; defaults to the canonical host.
    pub display_name: String,

    /// Current lifecycle state.
    pub status: ConnectionStatus,

    /// Failed attempts since the last success.
    pub retry_count: u32,

    /// Attempt budget consulted before accepting a reconnect.
    pub max_retry_attempts: u32,

    /// Whether reconnect attempts are accepted after a failure.
    pub auto_reconnect: bool,

    /// When the current session was established.
    pub connected_at: Option<Timestamp>,

    /// When the snapshot was last replaced.
    pub last_refreshed_at: Option<Timestamp>,

    /// Classified text of the most recent failure.
    pub last_error: Option<String>,

    /// Discovered queues, ordered by name. Replaced wholesale on each
    /// discovery pass, never merged.
    pub queues: Vec<QueueSnapshot>,

    /// System queues held back from the latest snapshot because the caller
    /// excluded them. Counted so totals stay honest.
    pub hidden_system_queues: usize,
}

impl Connection {
    /// Create a new connection record in `NotConnected` state
    pub fn new(
        host: CanonicalHost,
        display_name: Option<String>,
        max_retry_attempts: u32,
        auto_reconnect: bool,
    ) -> Self {
        let display_name = display_name.unwrap_or_else(|| host.to_string());
        Self {
            id: ConnectionId::new(),
            host,
            display_name,
            status: ConnectionStatus::NotConnected,
            retry_count: 0,
            max_retry_attempts,
            auto_reconnect,
            connected_at: None,
            last_refreshed_at: None,
            last_error: None,
            queues: Vec::new(),
            hidden_system_queues: 0,
        }
    }

    /// Number of queues in the current snapshot
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Check if an attempt is in flight or has succeeded
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Check if a reconnect attempt would be accepted
    ///
    /// Reconnects require a retry-eligible state, the auto-reconnect flag,
    /// and remaining attempt budget.
    pub fn can_attempt_reconnect(&self) -> bool {
        self.status.can_retry() && self.auto_reconnect && self.retry_count < self.max_retry_attempts
    }

    /// Move into `Connecting` for a new attempt
    pub fn begin_attempt(&mut self) {
        debug_assert!(
            self.status.can_transition_to(ConnectionStatus::Connecting),
            "attempt started from {}",
            self.status
        );
        self.status = ConnectionStatus::Connecting;
    }

    /// Record a successful probe and discovery pass
    ///
    /// Resets the retry budget and clears the last error.
    pub fn mark_connected(&mut self) {
        debug_assert!(
            self.status.can_transition_to(ConnectionStatus::Connected),
            "connected from {}",
            self.status
        );
        self.status = ConnectionStatus::Connected;
        self.connected_at = Some(Timestamp::now());
        self.retry_count = 0;
        self.last_error = None;
    }

    /// Replace the queue snapshot and stamp the refresh time
    pub fn apply_snapshot(&mut self, queues: Vec<QueueSnapshot>, hidden_system_queues: usize) {
        self.queues = queues;
        self.hidden_system_queues = hidden_system_queues;
        self.last_refreshed_at = Some(Timestamp::now());
    }

    /// Record a failed attempt
    ///
    /// `status` distinguishes deadline expiry (`Timeout`) from every other
    /// failure (`Failed`). Consumes one unit of retry budget.
    pub fn record_failure(&mut self, status: ConnectionStatus, message: String) {
        debug_assert!(status.is_failure(), "recorded {} as a failure", status);
        debug_assert!(
            self.status.can_transition_to(status),
            "failure recorded from {}",
            self.status
        );
        self.status = status;
        self.last_error = Some(message);
        self.retry_count += 1;
    }

    /// Tear the session down
    pub fn mark_disconnected(&mut self) {
        debug_assert!(
            self.status.can_transition_to(ConnectionStatus::Disconnected),
            "disconnected from {}",
            self.status
        );
        self.status = ConnectionStatus::Disconnected;
        self.connected_at = None;
    }
}
