//! # Queue Scout Core
//!
//! Core library for inspecting message queue hosts: address normalization
//! and journal derivation, connection lifecycle management, queue discovery,
//! and error classification.
//!
//! This library provides:
//! - Host normalization and queue address handling, including derived
//!   journal addresses
//! - A connection registry with one entry per normalized host
//! - The lifecycle manager: connect, refresh, disconnect, with per-host
//!   serialization, bounded probes, deadlines, and cancellation
//! - Discovery passes that snapshot a host's queues with best-effort journal
//!   counts
//! - A fixed classifier turning transport failures into remediation text
//! - Broadcast lifecycle events decoupled from the transport
//!
//! ## Module Organization
//!
//! - [address] - Host normalization and queue address parsing
//! - [cancel] - Cooperative cancellation tokens
//! - [classify] - Transport failure classification
//! - [config] - Manager configuration and validation
//! - [connection] - Connection records and their state machine
//! - [discovery] - Queue enumeration and existence checks
//! - [events] - Lifecycle event bus
//! - [manager] - Connection lifecycle operations
//! - [registry] - Concurrent connection table
//! - [retry] - Backoff policy for caller-driven reconnects

// Module declarations
pub mod address;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod events;
pub mod manager;
pub mod registry;
pub mod retry;

// Re-export commonly used types at crate root for convenience
pub use address::{AddressError, AddressFamily, CanonicalHost, QueueAddress};
pub use cancel::CancelToken;
pub use classify::classify;
pub use config::{ConfigError, ManagerConfig};
pub use connection::{
    Connection, ConnectionId, ConnectionStatus, ParseError, QueueCategory, QueueSnapshot,
};
pub use discovery::{DiscoveryOutcome, QueueDiscoveryService};
pub use events::{ConnectionEvent, ConnectionEventBus};
pub use manager::{ConnectError, ConnectOptions, ConnectionManager, RefreshOptions};
pub use registry::ConnectionRegistry;
pub use retry::{RetryPolicy, RetryState};
