//! Queue transport implementations.
//!
//! This module contains concrete implementations of the `QueueTransport`
//! trait.

pub mod memory;

pub use memory::{HostSeed, InMemoryConfig, InMemoryTransport, QueueSeed};
