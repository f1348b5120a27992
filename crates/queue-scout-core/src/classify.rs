//! # Error Classification
//!
//! Maps the transport's fixed error-code set to deterministic,
//! remediation-oriented text for display to operators.

use queue_transport::TransportError;

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;

/// Classify a transport failure into user-facing text
///
/// A fixed mapping table over the known failure categories. Categories outside
/// the table pass through with their original message unmodified rather than
/// being coerced into a generic bucket. Pure: identical input always yields
/// identical output.
pub fn classify(error: &TransportError) -> String {
    match error {
        TransportError::HostUnreachable { host, .. } => format!(
            "Cannot reach host '{}'. Verify the machine is powered on and reachable over the network.",
            host
        ),
        TransportError::NameResolution { host } => format!(
            "Host name '{}' could not be resolved. Check the spelling or connect by IP address.",
            host
        ),
        TransportError::ServiceUnavailable { host, .. } => format!(
            "The message queueing service on '{}' is not installed or not running. Install the queueing feature or start its service.",
            host
        ),
        TransportError::AccessDenied { resource } => format!(
            "Access to '{}' was denied. The current account lacks permission; retry with credentials that have rights on the remote host.",
            resource
        ),
        TransportError::Timeout { duration } => format!(
            "The operation did not complete within {} seconds. The host may be overloaded, or the deadline too short for this network.",
            duration.num_seconds()
        ),
        // Outside the mapping table: pass the original message through
        TransportError::QueueNotFound { .. }
        | TransportError::MalformedAddress { .. }
        | TransportError::Internal { .. } => error.to_string(),
    }
}
