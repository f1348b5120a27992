//! # Queue Discovery
//!
//! One enumeration pass producing queue snapshots for a host, plus a guarded
//! existence check for individual addresses.
//!
//! A pass is atomic: snapshots accumulate in a local list that is returned
//! whole or discarded with the future, never published piecemeal. Journal
//! counts are best-effort; a queue whose journal cannot be read keeps a zero
//! journal count and no error. Only the top-level enumeration can fail the
//! pass.

use crate::address::{CanonicalHost, QueueAddress};
use crate::classify::classify;
use crate::connection::{QueueCategory, QueueSnapshot};
use queue_transport::{QueueInfo, QueueTransport, TransportError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;

/// Result of one discovery pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    /// Snapshots ordered by queue name.
    pub snapshots: Vec<QueueSnapshot>,

    /// System queues held back because the caller excluded them.
    pub hidden_system_queues: usize,
}

/// Enumerates queues on a host and augments each with journal information
pub struct QueueDiscoveryService {
    transport: Arc<dyn QueueTransport>,
}

impl QueueDiscoveryService {
    /// Create a discovery service over a transport
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self { transport }
    }

    /// Enumerate queues visible at `host`
    ///
    /// System queues are filtered out unless `include_system_queues` is set,
    /// and counted either way. Per-queue failures degrade the affected
    /// snapshot instead of failing the pass.
    pub async fn discover(
        &self,
        host: &CanonicalHost,
        include_system_queues: bool,
    ) -> Result<DiscoveryOutcome, TransportError> {
        let queues = self.transport.list_queues(host.as_str()).await?;

        let mut snapshots = Vec::with_capacity(queues.len());
        let mut hidden_system_queues = 0;

        for info in queues {
            let category = classify_queue(&info);
            if category.is_system() && !include_system_queues {
                hidden_system_queues += 1;
                continue;
            }

            snapshots.push(self.snapshot_queue(host, info, category).await);
        }

        Ok(DiscoveryOutcome {
            snapshots,
            hidden_system_queues,
        })
    }

    /// Build the snapshot for one discovered queue
    async fn snapshot_queue(
        &self,
        host: &CanonicalHost,
        info: QueueInfo,
        category: QueueCategory,
    ) -> QueueSnapshot {
        let format_address = QueueAddress::direct_format(host, &info.name);
        let journal_address = format_address.derive_journal_address();

        let (message_count, accessible, error) = match self.count_messages(&format_address).await {
            Ok(count) => (count, true, None),
            Err(reason) => (0, false, Some(reason)),
        };

        // A missing or unauthorized journal says nothing about the queue
        // itself.
        let journal_message_count = match self.count_messages(&journal_address).await {
            Ok(count) => count,
            Err(reason) => {
                debug!(
                    queue = %info.name,
                    reason = %reason,
                    "Journal count unavailable, defaulting to zero"
                );
                0
            }
        };

        QueueSnapshot {
            name: info.name,
            path: info.path_name,
            format_name: format_address.to_string(),
            journal_address: journal_address.to_string(),
            message_count,
            journal_message_count,
            accessible,
            error,
            category,
        }
    }

    /// Count messages behind an address, classifying any failure
    async fn count_messages(&self, address: &QueueAddress) -> Result<u64, String> {
        let provider_address = address
            .to_provider_address()
            .map_err(|error| error.to_string())?;

        self.transport
            .message_count(&provider_address)
            .await
            .map_err(|error| classify(&error))
    }

    /// Check whether an address points at a real queue
    ///
    /// Performs a guarded open: "not found" means the queue does not exist,
    /// "access denied" means it exists but is unauthorized. Any other failure
    /// propagates rather than being coerced into a boolean.
    pub async fn exists(&self, address: &QueueAddress) -> Result<bool, TransportError> {
        let provider_address =
            address
                .to_provider_address()
                .map_err(|error| TransportError::MalformedAddress {
                    input: address.to_string(),
                    message: error.to_string(),
                })?;

        match self.transport.open_queue(&provider_address).await {
            Ok(_) => Ok(true),
            Err(TransportError::QueueNotFound { .. }) => Ok(false),
            Err(TransportError::AccessDenied { .. }) => Ok(true),
            Err(error) => Err(error),
        }
    }
}

/// Categorize a queue from what enumeration reported
fn classify_queue(info: &QueueInfo) -> QueueCategory {
    let is_journal = QueueAddress::parse(&info.path_name)
        .map(|address| address.is_journal())
        .unwrap_or(false);
    QueueCategory::from_discovery(info.is_system, is_journal)
}
