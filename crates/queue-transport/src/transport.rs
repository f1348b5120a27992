//! Transport trait, addresses, and configuration.

use crate::credentials::Credentials;
use crate::error::{TransportError, ValidationError};
use crate::message::{MessageId, OutboundMessage, QueueMessage};
use crate::providers::{InMemoryConfig, InMemoryTransport};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

// ============================================================================
// Addresses
// ============================================================================

/// Canonical queue address in the form the transport accepts
///
/// Produced by the address resolver; transports parse it but never rewrite it.
/// The canonical form is a direct format name such as
/// `DIRECT=OS:mq-host\private$\orders`, with an optional journal marker
/// appended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderAddress(String);

impl ProviderAddress {
    /// Create new provider address with validation
    pub fn new(address: String) -> Result<Self, ValidationError> {
        if address.is_empty() {
            return Err(ValidationError::Required {
                field: "provider_address".to_string(),
            });
        }

        if address.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidFormat {
                field: "provider_address".to_string(),
                message: "control characters not allowed".to_string(),
            });
        }

        Ok(Self(address))
    }

    /// Get address as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

// ============================================================================
// Host and Queue Descriptions
// ============================================================================

/// Result of a successful host probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Machine name as reported by the queue service
    pub machine_name: String,
    /// Queue service version, when the host reports one
    pub service_version: Option<String>,
}

/// Identity of a queue as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    /// Bare queue name without path decoration
    pub name: String,
    /// Full path name, e.g. `mq-host\private$\orders`
    pub path_name: String,
    /// Whether the host marks this as a system queue
    pub is_system: bool,
}

/// Details of a successfully opened queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDetails {
    /// Bare queue name without path decoration
    pub name: String,
    /// Full path name, e.g. `mq-host\private$\orders`
    pub path_name: String,
    /// Whether the opened target is a journal
    pub is_journal: bool,
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Interface implemented by queue transports
///
/// All operations are unbounded in time from the transport's point of view;
/// callers wrap them in deadlines. Errors use the fixed
/// [`TransportError`] code set so layers above can match on variants.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Verify a host is reachable and its queue service is accepting requests
    async fn probe_host(
        &self,
        host: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HostInfo, TransportError>;

    /// Enumerate queues on a host
    async fn list_queues(&self, host: &str) -> Result<Vec<QueueInfo>, TransportError>;

    /// Open a queue, verifying existence and read access
    async fn open_queue(&self, address: &ProviderAddress) -> Result<QueueDetails, TransportError>;

    /// Count messages currently in a queue or journal
    async fn message_count(&self, address: &ProviderAddress) -> Result<u64, TransportError>;

    /// Read up to `max_messages` messages without consuming them
    async fn peek_messages(
        &self,
        address: &ProviderAddress,
        max_messages: u32,
    ) -> Result<Vec<QueueMessage>, TransportError>;

    /// Receive and consume the next message, waiting up to `timeout`
    async fn receive_message(
        &self,
        address: &ProviderAddress,
        timeout: Duration,
    ) -> Result<Option<QueueMessage>, TransportError>;

    /// Send a message to a queue
    async fn send_message(
        &self,
        address: &ProviderAddress,
        message: OutboundMessage,
    ) -> Result<MessageId, TransportError>;

    /// Remove all messages from a queue, returning the number removed
    async fn purge_queue(&self, address: &ProviderAddress) -> Result<u64, TransportError>;

    /// Short name identifying the transport implementation
    fn transport_name(&self) -> &'static str;
}

// ============================================================================
// Configuration and Factory
// ============================================================================

/// Transport-specific configuration
///
/// Single-variant today; a native queue service binding slots in as a new
/// variant without touching callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransportConfig {
    InMemory(InMemoryConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::InMemory(InMemoryConfig::default())
    }
}

/// Create transport from configuration
pub fn create_transport(config: TransportConfig) -> Result<Box<dyn QueueTransport>, TransportError> {
    match config {
        TransportConfig::InMemory(in_memory_config) => {
            Ok(Box::new(InMemoryTransport::new(in_memory_config)))
        }
    }
}
