//! # Connection Registry
//!
//! Owned, concurrently accessible table of connections keyed by normalized
//! host. Enforces at-most-one connection per host; a secondary index resolves
//! connection ids back to hosts. Reads and inserts for distinct hosts never
//! contend on a global lock.

use crate::address::CanonicalHost;
use crate::connection::{Connection, ConnectionId};
use dashmap::DashMap;
use tracing::debug;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// In-memory table of connections
///
/// Constructed and owned by the lifecycle manager; callers observe it only
/// through cloned-out records, never live references.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Connections by normalized host.
    connections: DashMap<CanonicalHost, Connection>,

    /// Host lookup by connection id, kept 1:1 with `connections`.
    by_id: DashMap<ConnectionId, CanonicalHost>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a connection by normalized host
    pub fn get(&self, host: &CanonicalHost) -> Option<Connection> {
        self.connections.get(host).map(|entry| entry.value().clone())
    }

    /// Look up a connection by id
    pub fn get_by_id(&self, id: ConnectionId) -> Option<Connection> {
        let host = self.host_for(id)?;
        self.get(&host)
    }

    /// Resolve a connection id to its normalized host
    pub fn host_for(&self, id: ConnectionId) -> Option<CanonicalHost> {
        self.by_id.get(&id).map(|entry| entry.value().clone())
    }

    /// Insert or replace the connection for a host
    ///
    /// Replacing an entry retires the previous connection id; stale ids stop
    /// resolving immediately.
    pub fn insert(&self, connection: Connection) {
        let host = connection.host.clone();
        let id = connection.id;

        if let Some(previous) = self.connections.insert(host.clone(), connection) {
            if previous.id != id {
                self.by_id.remove(&previous.id);
            }
        }
        self.by_id.insert(id, host.clone());

        debug!(host = %host, connection_id = %id, "Connection registered");
    }

    /// Mutate a connection in place, returning the updated record
    ///
    /// Returns `None` when the id no longer resolves. The closure runs under
    /// the entry's lock, so keep it short and never call back into the
    /// registry from inside it.
    pub fn update<F>(&self, id: ConnectionId, mutate: F) -> Option<Connection>
    where
        F: FnOnce(&mut Connection),
    {
        let host = self.host_for(id)?;
        let mut entry = self.connections.get_mut(&host)?;
        mutate(entry.value_mut());
        Some(entry.value().clone())
    }

    /// Remove a connection, returning the final record
    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        let (_, host) = self.by_id.remove(&id)?;
        let removed = self
            .connections
            .remove(&host)
            .map(|(_, connection)| connection);

        if removed.is_some() {
            debug!(host = %host, connection_id = %id, "Connection removed");
        }
        removed
    }

    /// Snapshot of every connection, ordered by host
    pub fn list(&self) -> Vec<Connection> {
        let mut connections: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        connections.sort_by(|a, b| a.host.as_str().cmp(b.host.as_str()));
        connections
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
