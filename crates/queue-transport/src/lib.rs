//! # Queue Transport
//!
//! Provider-agnostic transport layer for inspecting message queue hosts,
//! with an in-memory simulated network for testing and development.
//!
//! This library provides:
//! - Host probing (reachability and queue service liveness)
//! - Queue enumeration and per-queue message counts
//! - Guarded queue opens for existence and accessibility checks
//! - Message peek, receive, send, and purge operations
//! - A fault-injecting in-memory transport
//!
//! ## Module Organization
//!
//! - [error] - Error types for all transport operations
//! - [message] - Message structures and identifiers
//! - [credentials] - Credential handling with secure cleanup
//! - [transport] - Transport trait, addresses, and configuration
//! - [providers] - Concrete transport implementations

// Module declarations
pub mod credentials;
pub mod error;
pub mod message;
pub mod providers;
pub mod transport;

// Re-export commonly used types at crate root for convenience
pub use credentials::Credentials;
pub use error::{TransportError, ValidationError};
pub use message::{MessageId, OutboundMessage, QueueMessage, Timestamp};
pub use providers::{HostSeed, InMemoryConfig, InMemoryTransport, QueueSeed};
pub use transport::{
    create_transport, HostInfo, ProviderAddress, QueueDetails, QueueInfo, QueueTransport,
    TransportConfig,
};
