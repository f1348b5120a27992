//! In-memory queue transport implementation for testing and development.
//!
//! This module provides a fully functional simulated queue network that:
//! - Hosts a configurable topology of machines and queues
//! - Simulates unreachable hosts, failed name resolution, stopped services,
//!   slow links, and per-queue access denial
//! - Maintains journals that record messages consumed from their queue
//! - Provides thread-safe concurrent access
//!
//! This transport is intended for:
//! - Unit and integration testing of queue-scout consumers
//! - Development and demos without a real queue host
//! - Reference implementation for native transports

use crate::credentials::Credentials;
use crate::error::TransportError;
use crate::message::{MessageId, OutboundMessage, QueueMessage, Timestamp};
use crate::transport::{HostInfo, ProviderAddress, QueueDetails, QueueInfo, QueueTransport};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Seed Configuration
// ============================================================================

/// In-memory transport configuration
///
/// Describes the simulated network topology. An empty topology resolves no
/// hosts; every probe fails with a name resolution error until hosts are
/// seeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryConfig {
    #[serde(default)]
    pub hosts: Vec<HostSeed>,
}

/// A simulated host and its failure-injection switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSeed {
    pub name: String,
    #[serde(default = "default_true")]
    pub online: bool,
    #[serde(default = "default_true")]
    pub resolvable: bool,
    #[serde(default = "default_true")]
    pub service_running: bool,
    /// Added to every operation against this host
    #[serde(default)]
    pub latency_ms: Option<u64>,
    /// When set, probes must present matching credentials
    #[serde(default)]
    pub required_username: Option<String>,
    #[serde(default)]
    pub required_secret: Option<String>,
    #[serde(default)]
    pub queues: Vec<QueueSeed>,
}

impl HostSeed {
    /// Create a healthy host seed with no queues
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            online: true,
            resolvable: true,
            service_running: true,
            latency_ms: None,
            required_username: None,
            required_secret: None,
            queues: Vec::new(),
        }
    }

    /// Add a queue to the host
    pub fn with_queue(mut self, queue: QueueSeed) -> Self {
        self.queues.push(queue);
        self
    }
}

/// A simulated queue with pre-populated message counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSeed {
    pub name: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub journal_count: u32,
    #[serde(default)]
    pub deny_access: bool,
    #[serde(default)]
    pub deny_journal_access: bool,
    #[serde(default)]
    pub system: bool,
}

impl QueueSeed {
    /// Create an accessible application queue seed
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_count: 0,
            journal_count: 0,
            deny_access: false,
            deny_journal_access: false,
            system: false,
        }
    }

    /// Pre-populate the queue with placeholder messages
    pub fn with_messages(mut self, count: u32) -> Self {
        self.message_count = count;
        self
    }

    /// Pre-populate the journal with placeholder messages
    pub fn with_journal_messages(mut self, count: u32) -> Self {
        self.journal_count = count;
        self
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Simulated network topology
struct SimulatedNetwork {
    /// Hosts keyed by lowercase name
    hosts: HashMap<String, SimulatedHost>,
}

impl SimulatedNetwork {
    fn from_config(config: InMemoryConfig) -> Self {
        let mut hosts = HashMap::new();
        for seed in config.hosts {
            hosts.insert(seed.name.to_lowercase(), SimulatedHost::from_seed(seed));
        }
        Self { hosts }
    }
}

/// State for a single simulated host
struct SimulatedHost {
    machine_name: String,
    online: bool,
    resolvable: bool,
    service_running: bool,
    latency: Option<std::time::Duration>,
    required_credentials: Option<(String, String)>,
    /// Queues keyed by lowercase bare name
    queues: HashMap<String, SimulatedQueue>,
}

impl SimulatedHost {
    fn from_seed(seed: HostSeed) -> Self {
        let machine_name = seed.name.to_lowercase();
        let required_credentials = match (seed.required_username, seed.required_secret) {
            (Some(username), secret) => Some((username, secret.unwrap_or_default())),
            (None, _) => None,
        };

        let mut queues = HashMap::new();
        for queue_seed in seed.queues {
            queues.insert(
                queue_seed.name.to_lowercase(),
                SimulatedQueue::from_seed(queue_seed),
            );
        }

        Self {
            machine_name,
            online: seed.online,
            resolvable: seed.resolvable,
            service_running: seed.service_running,
            latency: seed.latency_ms.map(std::time::Duration::from_millis),
            required_credentials,
            queues,
        }
    }
}

/// State for a single simulated queue and its journal
struct SimulatedQueue {
    name: String,
    is_system: bool,
    deny_access: bool,
    deny_journal_access: bool,
    messages: VecDeque<QueueMessage>,
    journal: VecDeque<QueueMessage>,
}

impl SimulatedQueue {
    fn from_seed(seed: QueueSeed) -> Self {
        let messages = placeholder_messages(&seed.name, seed.message_count);
        let journal = placeholder_messages(&seed.name, seed.journal_count);

        Self {
            name: seed.name.to_lowercase(),
            is_system: seed.system,
            deny_access: seed.deny_access,
            deny_journal_access: seed.deny_journal_access,
            messages,
            journal,
        }
    }
}

fn placeholder_messages(queue_name: &str, count: u32) -> VecDeque<QueueMessage> {
    (0..count)
        .map(|index| QueueMessage {
            id: MessageId::new(),
            label: format!("{}-{}", queue_name, index),
            body: Bytes::from(format!("seed message {}", index)),
            correlation_id: None,
            sent_at: Timestamp::now(),
        })
        .collect()
}

// ============================================================================
// Address Parsing
// ============================================================================

/// A provider address decomposed into the parts the simulation stores
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedAddress {
    host: String,
    queue: String,
    journal: bool,
}

/// Parse the canonical direct format name this transport accepts
///
/// Accepted grammar, case-insensitive throughout:
/// `[FormatName:]DIRECT=(OS|TCP):<host>\private$\<queue>[;journal]`
fn parse_address(address: &ProviderAddress) -> Result<ParsedAddress, TransportError> {
    let raw = address.as_str();
    let malformed = |message: &str| TransportError::MalformedAddress {
        input: raw.to_string(),
        message: message.to_string(),
    };

    let mut rest = raw;
    if let Some(stripped) = strip_prefix_ignore_case(rest, "FormatName:") {
        rest = stripped;
    }

    let Some(stripped) = strip_prefix_ignore_case(rest, "DIRECT=") else {
        return Err(malformed("expected DIRECT= format name"));
    };
    rest = stripped;

    let Some(stripped) =
        strip_prefix_ignore_case(rest, "OS:").or_else(|| strip_prefix_ignore_case(rest, "TCP:"))
    else {
        return Err(malformed("expected OS: or TCP: scheme"));
    };
    rest = stripped;

    let journal = if let Some(stripped) = strip_suffix_ignore_case(rest, ";JOURNAL") {
        rest = stripped;
        true
    } else {
        false
    };

    let Some(separator) = rest.find('\\') else {
        return Err(malformed("expected <host>\\private$\\<queue>"));
    };
    let (host, path) = rest.split_at(separator);

    let Some(queue) = strip_prefix_ignore_case(&path[1..], "private$\\") else {
        return Err(malformed("expected private$ queue path"));
    };

    if host.is_empty() || queue.is_empty() {
        return Err(malformed("host and queue name must be non-empty"));
    }

    Ok(ParsedAddress {
        host: host.to_lowercase(),
        queue: queue.to_lowercase(),
        journal,
    })
}

// Markers are pure ASCII; comparing bytes keeps these safe on arbitrary
// UTF-8 input.
fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    if value.len() >= suffix.len()
        && value.as_bytes()[value.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
    {
        Some(&value[..value.len() - suffix.len()])
    } else {
        None
    }
}

// ============================================================================
// InMemoryTransport
// ============================================================================

/// In-memory queue transport implementation
pub struct InMemoryTransport {
    state: Arc<RwLock<SimulatedNetwork>>,
}

impl InMemoryTransport {
    /// Create new in-memory transport with the given topology
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(SimulatedNetwork::from_config(config))),
        }
    }

    /// Reachability gate shared by every operation
    ///
    /// Returns the host's injected latency so callers can sleep outside the
    /// lock. Gate order matters: resolution, then reachability, then service
    /// state, matching how a real stack fails.
    fn host_gate(&self, host: &str) -> Result<Option<std::time::Duration>, TransportError> {
        let state = self.state.read().unwrap();
        let Some(entry) = state.hosts.get(&host.to_lowercase()) else {
            return Err(TransportError::NameResolution {
                host: host.to_string(),
            });
        };

        if !entry.resolvable {
            return Err(TransportError::NameResolution {
                host: host.to_string(),
            });
        }

        let latency = entry.latency;

        if !entry.online {
            return Err(TransportError::HostUnreachable {
                host: host.to_string(),
                message: "no route to host".to_string(),
            });
        }

        if !entry.service_running {
            return Err(TransportError::ServiceUnavailable {
                host: host.to_string(),
                message: "queue service is not running".to_string(),
            });
        }

        Ok(latency)
    }

    async fn apply_latency(&self, latency: Option<std::time::Duration>) {
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }

    /// Run `operation` against a queue after resolution and access checks
    fn with_queue<T>(
        &self,
        parsed: &ParsedAddress,
        operation: impl FnOnce(&mut SimulatedQueue) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut state = self.state.write().unwrap();
        let Some(host) = state.hosts.get_mut(&parsed.host) else {
            return Err(TransportError::NameResolution {
                host: parsed.host.clone(),
            });
        };

        let path = queue_path(&host.machine_name, &parsed.queue);
        let Some(queue) = host.queues.get_mut(&parsed.queue) else {
            return Err(TransportError::QueueNotFound { path });
        };

        let denied = if parsed.journal {
            queue.deny_journal_access
        } else {
            queue.deny_access
        };
        if denied {
            let resource = if parsed.journal {
                format!("{};journal", path)
            } else {
                path
            };
            return Err(TransportError::AccessDenied { resource });
        }

        operation(queue)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

fn queue_path(machine_name: &str, queue_name: &str) -> String {
    format!("{}\\private$\\{}", machine_name, queue_name)
}

/// Pop the next message, recording queue consumption in the journal
fn take_next(queue: &mut SimulatedQueue, journal: bool) -> Option<QueueMessage> {
    if journal {
        queue.journal.pop_front()
    } else {
        let received = queue.messages.pop_front();
        if let Some(message) = &received {
            queue.journal.push_back(message.clone());
        }
        received
    }
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    async fn probe_host(
        &self,
        host: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HostInfo, TransportError> {
        let latency = self.host_gate(host)?;
        self.apply_latency(latency).await;

        let state = self.state.read().unwrap();
        let entry = state
            .hosts
            .get(&host.to_lowercase())
            .ok_or_else(|| TransportError::NameResolution {
                host: host.to_string(),
            })?;

        if let Some((required_username, required_secret)) = &entry.required_credentials {
            let authorized = credentials.is_some_and(|presented| {
                presented.username() == required_username
                    && presented.expose_secret() == required_secret
            });
            if !authorized {
                return Err(TransportError::AccessDenied {
                    resource: host.to_string(),
                });
            }
        }

        debug!(host, machine_name = %entry.machine_name, "Probe answered");
        Ok(HostInfo {
            machine_name: entry.machine_name.clone(),
            service_version: Some("in-memory/1.0".to_string()),
        })
    }

    async fn list_queues(&self, host: &str) -> Result<Vec<QueueInfo>, TransportError> {
        let latency = self.host_gate(host)?;
        self.apply_latency(latency).await;

        let state = self.state.read().unwrap();
        let entry = state
            .hosts
            .get(&host.to_lowercase())
            .ok_or_else(|| TransportError::NameResolution {
                host: host.to_string(),
            })?;

        let mut queues: Vec<QueueInfo> = entry
            .queues
            .values()
            .map(|queue| QueueInfo {
                name: queue.name.clone(),
                path_name: queue_path(&entry.machine_name, &queue.name),
                is_system: queue.is_system,
            })
            .collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(host, count = queues.len(), "Enumerated queues");
        Ok(queues)
    }

    async fn open_queue(&self, address: &ProviderAddress) -> Result<QueueDetails, TransportError> {
        let parsed = parse_address(address)?;
        let latency = self.host_gate(&parsed.host)?;
        self.apply_latency(latency).await;

        self.with_queue(&parsed, |queue| {
            Ok(QueueDetails {
                name: queue.name.clone(),
                path_name: queue_path(&parsed.host, &queue.name),
                is_journal: parsed.journal,
            })
        })
    }

    async fn message_count(&self, address: &ProviderAddress) -> Result<u64, TransportError> {
        let parsed = parse_address(address)?;
        let latency = self.host_gate(&parsed.host)?;
        self.apply_latency(latency).await;

        self.with_queue(&parsed, |queue| {
            let count = if parsed.journal {
                queue.journal.len()
            } else {
                queue.messages.len()
            };
            Ok(count as u64)
        })
    }

    async fn peek_messages(
        &self,
        address: &ProviderAddress,
        max_messages: u32,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        let parsed = parse_address(address)?;
        let latency = self.host_gate(&parsed.host)?;
        self.apply_latency(latency).await;

        self.with_queue(&parsed, |queue| {
            let source = if parsed.journal {
                &queue.journal
            } else {
                &queue.messages
            };
            Ok(source
                .iter()
                .take(max_messages as usize)
                .cloned()
                .collect())
        })
    }

    async fn receive_message(
        &self,
        address: &ProviderAddress,
        timeout: Duration,
    ) -> Result<Option<QueueMessage>, TransportError> {
        let parsed = parse_address(address)?;
        let latency = self.host_gate(&parsed.host)?;
        self.apply_latency(latency).await;

        let journal = parsed.journal;
        if let Some(message) = self.with_queue(&parsed, |queue| Ok(take_next(queue, journal)))? {
            return Ok(Some(message));
        }

        // Empty queue: wait out the timeout and check once more
        let wait = timeout.to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        self.with_queue(&parsed, |queue| Ok(take_next(queue, journal)))
    }

    async fn send_message(
        &self,
        address: &ProviderAddress,
        message: OutboundMessage,
    ) -> Result<MessageId, TransportError> {
        let parsed = parse_address(address)?;
        let latency = self.host_gate(&parsed.host)?;
        self.apply_latency(latency).await;

        if parsed.journal {
            // Journals are read-only
            return Err(TransportError::AccessDenied {
                resource: format!("{};journal", queue_path(&parsed.host, &parsed.queue)),
            });
        }

        self.with_queue(&parsed, |queue| {
            let message_id = MessageId::new();
            queue.messages.push_back(QueueMessage {
                id: message_id.clone(),
                label: message.label,
                body: message.body,
                correlation_id: message.correlation_id,
                sent_at: Timestamp::now(),
            });
            Ok(message_id)
        })
    }

    async fn purge_queue(&self, address: &ProviderAddress) -> Result<u64, TransportError> {
        let parsed = parse_address(address)?;
        let latency = self.host_gate(&parsed.host)?;
        self.apply_latency(latency).await;

        self.with_queue(&parsed, |queue| {
            let target = if parsed.journal {
                &mut queue.journal
            } else {
                &mut queue.messages
            };
            let purged = target.len() as u64;
            target.clear();
            debug!(queue = %queue.name, purged, "Purged queue");
            Ok(purged)
        })
    }

    fn transport_name(&self) -> &'static str {
        "in-memory"
    }
}

// ============================================================================
// Topology Mutation
// ============================================================================

/// Runtime topology mutation for tests and demos
///
/// Methods targeting an existing host or queue return whether the change was
/// applied.
impl InMemoryTransport {
    /// Add a host to the topology, replacing any existing host with the name
    pub fn add_host(&self, seed: HostSeed) {
        let mut state = self.state.write().unwrap();
        state
            .hosts
            .insert(seed.name.to_lowercase(), SimulatedHost::from_seed(seed));
    }

    /// Mark a host reachable or unreachable
    pub fn set_host_online(&self, host: &str, online: bool) -> bool {
        self.update_host(host, |entry| entry.online = online)
    }

    /// Make a host name resolvable or not
    pub fn set_host_resolvable(&self, host: &str, resolvable: bool) -> bool {
        self.update_host(host, |entry| entry.resolvable = resolvable)
    }

    /// Start or stop the simulated queue service on a host
    pub fn set_service_running(&self, host: &str, running: bool) -> bool {
        self.update_host(host, |entry| entry.service_running = running)
    }

    /// Inject latency into every operation against a host
    pub fn set_host_latency(&self, host: &str, latency: Option<std::time::Duration>) -> bool {
        self.update_host(host, |entry| entry.latency = latency)
    }

    /// Require credentials for probes against a host
    pub fn require_credentials(&self, host: &str, username: &str, secret: &str) -> bool {
        self.update_host(host, |entry| {
            entry.required_credentials = Some((username.to_string(), secret.to_string()))
        })
    }

    /// Deny or allow access to a queue
    pub fn set_queue_access_denied(&self, host: &str, queue: &str, denied: bool) -> bool {
        self.update_queue(host, queue, |entry| entry.deny_access = denied)
    }

    /// Deny or allow access to a queue's journal
    pub fn set_journal_access_denied(&self, host: &str, queue: &str, denied: bool) -> bool {
        self.update_queue(host, queue, |entry| entry.deny_journal_access = denied)
    }

    /// Add a queue to an existing host
    pub fn add_queue(&self, host: &str, seed: QueueSeed) -> bool {
        self.update_host(host, |entry| {
            entry
                .queues
                .insert(seed.name.to_lowercase(), SimulatedQueue::from_seed(seed));
        })
    }

    /// Remove a queue from a host
    pub fn remove_queue(&self, host: &str, queue: &str) -> bool {
        let mut state = self.state.write().unwrap();
        state
            .hosts
            .get_mut(&host.to_lowercase())
            .is_some_and(|entry| entry.queues.remove(&queue.to_lowercase()).is_some())
    }

    fn update_host(&self, host: &str, update: impl FnOnce(&mut SimulatedHost)) -> bool {
        let mut state = self.state.write().unwrap();
        match state.hosts.get_mut(&host.to_lowercase()) {
            Some(entry) => {
                update(entry);
                true
            }
            None => false,
        }
    }

    fn update_queue(&self, host: &str, queue: &str, update: impl FnOnce(&mut SimulatedQueue)) -> bool {
        let mut state = self.state.write().unwrap();
        state
            .hosts
            .get_mut(&host.to_lowercase())
            .and_then(|entry| entry.queues.get_mut(&queue.to_lowercase()))
            .map(|entry| {
                update(entry);
                true
            })
            .unwrap_or(false)
    }
}
