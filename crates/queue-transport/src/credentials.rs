//! Credential handling for authenticated queue hosts.

use crate::error::ValidationError;
use std::fmt;
use zeroize::Zeroize;

/// Credentials presented when probing or opening queues on a remote host
///
/// The secret is never included in Debug output or logs, and its memory is
/// zeroed on drop.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    /// Create credentials with validation
    pub fn new(username: String, secret: String) -> Result<Self, ValidationError> {
        if username.is_empty() {
            return Err(ValidationError::Required {
                field: "username".to_string(),
            });
        }

        Ok(Self { username, secret })
    }

    /// Get the username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the secret (only for immediate use)
    ///
    /// # Security Warning
    /// The returned string contains the actual secret value.
    /// Use immediately and avoid storing in variables.
    pub fn expose_secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// Secure cleanup on drop
impl Drop for Credentials {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
