//! # Connection Events
//!
//! Publish/subscribe notifications for connection lifecycle changes.
//!
//! The bus is a broadcast channel: every subscriber sees every event
//! published after it subscribed, and slow subscribers lose oldest events
//! first once the buffer fills. Delivery is decoupled from the transport so
//! subscribers can be exercised without any network I/O.

use crate::connection::{ConnectionId, ConnectionStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

/// Notification emitted by the connection lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// A connection moved between lifecycle states.
    StateChanged {
        connection_id: ConnectionId,
        previous_status: ConnectionStatus,
        new_status: ConnectionStatus,
    },

    /// A discovery pass replaced a connection's queue snapshot.
    Refreshed {
        connection_id: ConnectionId,
        queue_count: usize,
    },

    /// A connect or refresh attempt failed.
    Failed {
        connection_id: ConnectionId,
        error_message: String,
        will_retry: bool,
        retry_attempt: u32,
    },
}

impl ConnectionEvent {
    /// Connection the event concerns
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::StateChanged { connection_id, .. }
            | Self::Refreshed { connection_id, .. }
            | Self::Failed { connection_id, .. } => *connection_id,
        }
    }
}

/// Broadcast bus carrying [`ConnectionEvent`] notifications
///
/// Publishing is fire-and-forget: an event nobody is listening for is
/// dropped, never queued for future subscribers.
#[derive(Debug)]
pub struct ConnectionEventBus {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionEventBus {
    /// Buffer size used by [`Default`]
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every current subscriber
    ///
    /// Returns the number of subscribers the event reached; zero when nobody
    /// is listening.
    pub fn publish(&self, event: ConnectionEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }

    /// Register a new subscriber
    ///
    /// The subscriber sees only events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ConnectionEventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
