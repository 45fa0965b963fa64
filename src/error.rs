//! Error types for synapse.
//!
//! Uses `thiserror` for ergonomic error definitions. Only parse and
//! configuration errors ever stop a run; network-level failures are folded
//! into result classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use crate::types::{PortError, TargetError};

/// Malformed target or port specification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Port(#[from] PortError),
}

/// Invalid scan configuration or unreadable settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid proxy '{0}': {1}")]
    InvalidProxy(String, String),

    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("{count} targets requested, more than the configured maximum of {max}")]
    TooManyTargets { count: u128, max: u64 },

    #[error(transparent)]
    Targets(#[from] TargetError),

    #[error(transparent)]
    Ports(#[from] PortError),
}

/// Result type alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name resolution failure, kept apart from other network errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("failed to resolve '{0}': {1}")]
    Failed(String, String),

    #[error("no addresses found for '{0}'")]
    NoAddresses(String),

    #[error("resolution of '{0}' timed out")]
    Timeout(String),
}

/// Category of a sub-probe failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConnectionRefused,
    Timeout,
    DnsResolutionFailed,
    /// The platform or peer did not expose the requested data.
    Unavailable,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::DnsResolutionFailed => "dns_resolution_failed",
            Self::Unavailable => "unavailable",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Why a sub-probe produced no data.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl ProbeFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(FailureKind::Timeout, "operation timed out")
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Unavailable, detail)
    }

    /// Classify an I/O error from a connect, read or write.
    pub fn from_io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
            io::ErrorKind::TimedOut => FailureKind::Timeout,
            _ if is_dns_failure(err) => FailureKind::DnsResolutionFailed,
            _ => FailureKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ResolveError> for ProbeFailure {
    fn from(err: ResolveError) -> Self {
        Self::new(FailureKind::DnsResolutionFailed, err.to_string())
    }
}

/// The standard library reports getaddrinfo failures as uncategorized I/O
/// errors, so the message is the only signal.
fn is_dns_failure(err: &io::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("failed to lookup address")
        || msg.contains("name or service not known")
        || msg.contains("nodename nor servname")
        || msg.contains("no such host")
        || msg.contains("temporary failure in name resolution")
}
