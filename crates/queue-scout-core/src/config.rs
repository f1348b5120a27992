//! # Lifecycle Manager Configuration
//!
//! Settings governing connect deadlines, probe fan-out, reconnect policy,
//! and event buffering. All fields carry serde defaults so a partially
//! specified configuration file deserializes cleanly.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Errors raised by configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} {message}")]
    Invalid { field: String, message: String },
}

/// Configuration for the connection lifecycle manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Deadline applied to connect and refresh calls that do not carry their
    /// own, in seconds.
    pub default_deadline_seconds: u64,

    /// Cap on simultaneous outbound host probes.
    pub max_concurrent_probes: usize,

    /// Reconnect attempts accepted after a failure before the budget is
    /// exhausted.
    pub max_retry_attempts: u32,

    /// Whether reconnect attempts are accepted at all.
    pub auto_reconnect: bool,

    /// Whether discovery keeps system queues in the snapshot.
    pub include_system_queues: bool,

    /// Events buffered per subscriber before oldest are dropped.
    pub event_buffer_size: usize,

    /// Delay before the first reconnect attempt, in milliseconds.
    pub retry_initial_delay_ms: u64,

    /// Cap on the delay between reconnect attempts, in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Exponential growth factor between reconnect delays.
    pub retry_backoff_multiplier: f64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_deadline_seconds: 30,
            max_concurrent_probes: 4,
            max_retry_attempts: 3,
            auto_reconnect: true,
            include_system_queues: false,
            event_buffer_size: 256,
            retry_initial_delay_ms: 1_000,
            retry_max_delay_ms: 30_000,
            retry_backoff_multiplier: 2.0,
        }
    }
}

impl ManagerConfig {
    /// Deadline applied when a call does not carry its own
    pub fn default_deadline(&self) -> Duration {
        Duration::from_secs(self.default_deadline_seconds)
    }

    /// Backoff policy derived from the retry fields
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retry_attempts,
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
            self.retry_backoff_multiplier,
        )
    }

    /// Check the configuration for values that cannot work at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_deadline_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "default_deadline_seconds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.max_concurrent_probes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_probes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.event_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "event_buffer_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.retry_initial_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "retry_initial_delay_ms".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            return Err(ConfigError::Invalid {
                field: "retry_max_delay_ms".to_string(),
                message: "must be at least the initial delay".to_string(),
            });
        }

        if self.retry_backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "retry_backoff_multiplier".to_string(),
                message: "must be at least 1.0".to_string(),
            });
        }

        Ok(())
    }
}
