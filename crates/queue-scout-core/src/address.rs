//! # Queue Address Resolution
//!
//! Pure, side-effect-free handling of host names and queue addresses.
//!
//! Three addressing families are recognized:
//! - Format names: `FormatName:DIRECT=OS:host\private$\orders`, or the bare
//!   `DIRECT=`/`PUBLIC=`/`PRIVATE=` grammar without the label
//! - Bare direct schemes: `OS:host\private$\orders`,
//!   `TCP:10.0.0.5\private$\orders`
//! - Hierarchical paths: `.\private$\orders`, `mq-01\private$\orders`
//!
//! Journal derivation differs by family. Format names take an uppercase
//! `;JOURNAL` suffix, bare direct schemes a lowercase `;journal` suffix, and
//! paths gain a `journal$` segment before the leaf name. The casing split
//! mirrors what the addressing scheme itself accepts and is intentional;
//! do not unify it.

use queue_transport::ProviderAddress;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;

/// Errors raised while normalizing hosts or parsing addresses
///
/// All of these reject input before any network I/O is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Host name is empty")]
    EmptyHost,

    #[error("Invalid host name '{input}': {message}")]
    InvalidHost { input: String, message: String },

    #[error("Unrecognized queue address '{input}': {message}")]
    UnrecognizedAddress { input: String, message: String },
}

// ============================================================================
// Host Normalization
// ============================================================================

/// Normalized host name used as the dedup key for connections
///
/// The single-dot shorthand, `localhost`, and the actual machine name all
/// normalize to the same canonical value. Comparison is case-insensitive by
/// construction: canonical values are always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalHost(String);

impl CanonicalHost {
    /// Normalize a raw host name
    pub fn normalize(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::EmptyHost);
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(AddressError::InvalidHost {
                input: input.to_string(),
                message: "control characters not allowed".to_string(),
            });
        }

        if trimmed.contains(['\\', '/']) {
            return Err(AddressError::InvalidHost {
                input: input.to_string(),
                message: "path separators not allowed in a host name".to_string(),
            });
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AddressError::InvalidHost {
                input: input.to_string(),
                message: "whitespace not allowed in a host name".to_string(),
            });
        }

        let lowered = trimmed.to_lowercase();
        if lowered == "." || lowered == "localhost" || lowered == local_machine_name() {
            Ok(Self::local())
        } else {
            Ok(Self(lowered))
        }
    }

    /// Canonical value for this machine
    pub fn local() -> Self {
        Self(local_machine_name().to_string())
    }

    /// Whether this host refers to the local machine
    pub fn is_local(&self) -> bool {
        self.0 == local_machine_name()
    }

    /// Get canonical host as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CanonicalHost {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

/// Local machine name, resolved once per process and cached
fn local_machine_name() -> &'static str {
    static NAME: OnceLock<String> = OnceLock::new();
    NAME.get_or_init(|| {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
            .to_lowercase()
    })
}

// ============================================================================
// Queue Addresses
// ============================================================================

/// Addressing family a queue address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    /// `FormatName:` label or bare `DIRECT=`/`PUBLIC=`/`PRIVATE=` grammar
    FormatName,
    /// Bare `OS:` or `TCP:` scheme without the format-name grammar
    Direct,
    /// Hierarchical `machine\private$\name` path
    Path,
}

/// A queue address in any of the recognized families
///
/// Preserves the caller's original spelling; family-specific rules are applied
/// on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueAddress {
    raw: String,
    family: AddressFamily,
}

impl QueueAddress {
    /// Compose a hierarchical path address for a private queue on `host`
    pub fn private_path(host: &CanonicalHost, queue: &str) -> Self {
        Self {
            raw: format!("{}\\private$\\{}", host, queue),
            family: AddressFamily::Path,
        }
    }

    /// Compose a direct format name for a private queue on `host`
    pub fn direct_format(host: &CanonicalHost, queue: &str) -> Self {
        Self {
            raw: format!("DIRECT=OS:{}\\private$\\{}", host, queue),
            family: AddressFamily::FormatName,
        }
    }

    /// Parse a raw queue address, classifying its family
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::UnrecognizedAddress {
                input: input.to_string(),
                message: "address is empty".to_string(),
            });
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(AddressError::UnrecognizedAddress {
                input: input.to_string(),
                message: "control characters not allowed".to_string(),
            });
        }

        if let Some(body) = strip_prefix_ignore_case(trimmed, "FormatName:") {
            if !has_format_name_grammar(body) {
                return Err(AddressError::UnrecognizedAddress {
                    input: input.to_string(),
                    message: "FormatName: must be followed by DIRECT=, PUBLIC=, or PRIVATE="
                        .to_string(),
                });
            }
            return Ok(Self {
                raw: trimmed.to_string(),
                family: AddressFamily::FormatName,
            });
        }

        if has_format_name_grammar(trimmed) {
            return Ok(Self {
                raw: trimmed.to_string(),
                family: AddressFamily::FormatName,
            });
        }

        if has_direct_scheme(trimmed) {
            return Ok(Self {
                raw: trimmed.to_string(),
                family: AddressFamily::Direct,
            });
        }

        if trimmed.contains('\\') {
            return Ok(Self {
                raw: trimmed.to_string(),
                family: AddressFamily::Path,
            });
        }

        Err(AddressError::UnrecognizedAddress {
            input: input.to_string(),
            message: "expected a format name, an OS:/TCP: address, or a machine\\private$\\name path"
                .to_string(),
        })
    }

    /// Get the addressing family
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Get the address exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this address already targets a journal
    pub fn is_journal(&self) -> bool {
        match self.family {
            AddressFamily::FormatName | AddressFamily::Direct => {
                ends_with_ignore_case(&self.raw, ";journal")
            }
            AddressFamily::Path => self
                .path_segments()
                .any(|segment| segment.eq_ignore_ascii_case("journal$")),
        }
    }

    /// Derive the companion journal address
    ///
    /// Always called on a canonical (non-journal) address; callers cache the
    /// result instead of re-deriving from it.
    pub fn derive_journal_address(&self) -> QueueAddress {
        debug_assert!(
            !self.is_journal(),
            "journal derivation must start from a non-journal address"
        );

        let raw = match self.family {
            // Uppercase marker for the format-name grammar
            AddressFamily::FormatName => format!("{};JOURNAL", self.raw),
            // Lowercase marker for bare direct schemes
            AddressFamily::Direct => format!("{};journal", self.raw),
            AddressFamily::Path => self.derive_journal_path(),
        };

        QueueAddress {
            raw,
            family: self.family,
        }
    }

    /// Insert a `journal$` segment before the leaf queue name
    fn derive_journal_path(&self) -> String {
        let segments: Vec<&str> = self.raw.split('\\').collect();
        let private_index = segments
            .iter()
            .position(|segment| segment.eq_ignore_ascii_case("private$"));

        match private_index {
            Some(index) if index + 1 < segments.len() => {
                let mut derived = segments;
                derived.insert(index + 1, "journal$");
                derived.join("\\")
            }
            // No recognizable private-queue segment: append a generic journal segment
            _ => format!("{}\\journal$", self.raw),
        }
    }

    /// Bare queue name, when one can be read from the address
    ///
    /// GUID-based format names and scheme-only addresses carry no name.
    pub fn queue_name(&self) -> Option<&str> {
        if !self.raw.contains('\\') {
            return None;
        }

        match self.family {
            AddressFamily::FormatName | AddressFamily::Direct => {
                let last = self.raw.rsplit('\\').next()?;
                let trimmed = strip_suffix_ignore_case(last, ";journal").unwrap_or(last);
                (!trimmed.is_empty()).then_some(trimmed)
            }
            AddressFamily::Path => {
                let last = self.raw.rsplit('\\').next()?;
                (!last.is_empty() && !last.eq_ignore_ascii_case("journal$")).then_some(last)
            }
        }
    }

    /// Host portion of the address, when one is present
    ///
    /// GUID-based `PUBLIC=`/`PRIVATE=` format names carry no host.
    pub fn host_part(&self) -> Option<&str> {
        match self.family {
            AddressFamily::FormatName => {
                let body = strip_prefix_ignore_case(&self.raw, "FormatName:").unwrap_or(&self.raw);
                let after_direct = strip_prefix_ignore_case(body, "DIRECT=")?;
                let after_scheme = strip_prefix_ignore_case(after_direct, "OS:")
                    .or_else(|| strip_prefix_ignore_case(after_direct, "TCP:"))?;
                let host = after_scheme.split('\\').next()?;
                (!host.is_empty()).then_some(host)
            }
            AddressFamily::Direct => {
                let after_scheme = strip_prefix_ignore_case(&self.raw, "OS:")
                    .or_else(|| strip_prefix_ignore_case(&self.raw, "TCP:"))?;
                let host = after_scheme.split('\\').next()?;
                (!host.is_empty()).then_some(host)
            }
            AddressFamily::Path => {
                let host = self.raw.split('\\').next()?;
                (!host.is_empty()).then_some(host)
            }
        }
    }

    /// Rewrite into the exact syntax the transport provider accepts
    ///
    /// Format names pass through unchanged apart from the optional label; bare
    /// direct schemes gain the `DIRECT=` prefix; paths are rewritten into a
    /// direct format name against the normalized host, carrying the journal
    /// marker when the path targets a journal.
    pub fn to_provider_address(&self) -> Result<ProviderAddress, AddressError> {
        let rewritten = match self.family {
            AddressFamily::FormatName => strip_prefix_ignore_case(&self.raw, "FormatName:")
                .unwrap_or(&self.raw)
                .to_string(),
            AddressFamily::Direct => format!("DIRECT={}", self.raw),
            AddressFamily::Path => self.path_to_direct_format()?,
        };

        ProviderAddress::new(rewritten).map_err(|error| AddressError::UnrecognizedAddress {
            input: self.raw.clone(),
            message: error.to_string(),
        })
    }

    fn path_to_direct_format(&self) -> Result<String, AddressError> {
        let mut segments = self.raw.split('\\');
        let host_segment = segments.next().unwrap_or_default();
        let host = CanonicalHost::normalize(host_segment)?;

        let mut journal = false;
        let rest: Vec<&str> = segments
            .filter(|segment| {
                if segment.eq_ignore_ascii_case("journal$") {
                    journal = true;
                    false
                } else {
                    true
                }
            })
            .collect();

        if rest.is_empty() {
            return Err(AddressError::UnrecognizedAddress {
                input: self.raw.clone(),
                message: "path has no queue name".to_string(),
            });
        }

        let mut rewritten = format!("DIRECT=OS:{}\\{}", host, rest.join("\\"));
        if journal {
            rewritten.push_str(";JOURNAL");
        }
        Ok(rewritten)
    }

    fn path_segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.raw.split('\\')
    }
}

impl fmt::Display for QueueAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for QueueAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Grammar Helpers
// ============================================================================

fn has_format_name_grammar(value: &str) -> bool {
    starts_with_ignore_case(value, "DIRECT=")
        || starts_with_ignore_case(value, "PUBLIC=")
        || starts_with_ignore_case(value, "PRIVATE=")
}

fn has_direct_scheme(value: &str) -> bool {
    starts_with_ignore_case(value, "OS:") || starts_with_ignore_case(value, "TCP:")
}

// Prefixes and suffixes are pure ASCII; comparing bytes keeps these safe on
// arbitrary UTF-8 input.
fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn ends_with_ignore_case(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len()
        && value.as_bytes()[value.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    starts_with_ignore_case(value, prefix).then(|| &value[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    ends_with_ignore_case(value, suffix).then(|| &value[..value.len() - suffix.len()])
}
