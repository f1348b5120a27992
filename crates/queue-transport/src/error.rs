//! Error types for transport operations.

use chrono::Duration;
use thiserror::Error;

/// Comprehensive error type for all transport operations
///
/// Variants correspond to the provider's fixed error-code set. Layers above
/// the transport match on variants rather than message text.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Host unreachable: {host}: {message}")]
    HostUnreachable { host: String, message: String },

    #[error("Cannot resolve host name: {host}")]
    NameResolution { host: String },

    #[error("Queue service unavailable on {host}: {message}")]
    ServiceUnavailable { host: String, message: String },

    #[error("Access denied: {resource}")]
    AccessDenied { resource: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Queue not found: {path}")]
    QueueNotFound { path: String },

    #[error("Malformed queue address '{input}': {message}")]
    MalformedAddress { input: String, message: String },

    #[error("Internal transport error: {message}")]
    Internal { message: String },
}

impl TransportError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HostUnreachable { .. } => true,
            Self::NameResolution { .. } => false,
            Self::ServiceUnavailable { .. } => true,
            Self::AccessDenied { .. } => false,
            Self::Timeout { .. } => true,
            Self::QueueNotFound { .. } => false,
            Self::MalformedAddress { .. } => false,
            Self::Internal { .. } => true, // Unclassified provider faults are usually transient
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self) -> bool {
        self.is_transient()
    }

    /// Get suggested retry delay
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::HostUnreachable { .. } => Some(Duration::seconds(5)),
            Self::ServiceUnavailable { .. } => Some(Duration::seconds(5)),
            Self::Timeout { .. } => Some(Duration::seconds(1)),
            _ => None,
        }
    }
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
