//! Per-endpoint scan results.

use crate::probe::{OsGuess, ProbeOutcome, ProbeReport, QuicInfo, TlsInfo};
use crate::services::service_name;
use crate::types::Port;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Status of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    /// A full TCP handshake completed.
    Open,
    /// Any connect failure.
    Closed,
    /// Reserved. Never produced by connect-based checks, which cannot tell a
    /// silent drop from a dead host.
    Filtered,
    /// Reserved. Never produced.
    Unknown,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Open => write!(f, "open"),
            PortStatus::Closed => write!(f, "closed"),
            PortStatus::Filtered => write!(f, "filtered"),
            PortStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
    Quic,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Quic => "quic",
        };
        f.write_str(s)
    }
}

/// Result of scanning one (target, port).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// The resolved address when resolution ran and succeeded, the original
    /// target otherwise.
    pub target: String,
    pub port: Port,
    pub status: PortStatus,
    pub protocol: Protocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "ProbeOutcome::is_not_run")]
    pub banner: ProbeOutcome<String>,
    #[serde(default, skip_serializing_if = "ProbeOutcome::is_not_run")]
    pub tls_info: ProbeOutcome<TlsInfo>,
    #[serde(default, skip_serializing_if = "ProbeOutcome::is_not_run")]
    pub quic_info: ProbeOutcome<QuicInfo>,
    #[serde(default, skip_serializing_if = "ProbeOutcome::is_not_run")]
    pub os_guess: ProbeOutcome<OsGuess>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl ScanResult {
    fn new(target: impl Into<String>, port: Port, status: PortStatus) -> Self {
        Self {
            target: target.into(),
            port,
            status,
            protocol: Protocol::Tcp,
            service: service_name(port).map(str::to_string),
            banner: ProbeOutcome::NotRun,
            tls_info: ProbeOutcome::NotRun,
            quic_info: ProbeOutcome::NotRun,
            os_guess: ProbeOutcome::NotRun,
            timestamp: Utc::now(),
            response_time_ms: None,
        }
    }

    pub fn open(target: impl Into<String>, port: Port, elapsed: Duration) -> Self {
        let mut result = Self::new(target, port, PortStatus::Open);
        result.response_time_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        result
    }

    pub fn closed(target: impl Into<String>, port: Port) -> Self {
        Self::new(target, port, PortStatus::Closed)
    }

    pub fn is_open(&self) -> bool {
        self.status == PortStatus::Open
    }

    /// Attach the probe pipeline's findings.
    pub fn with_report(mut self, report: ProbeReport) -> Self {
        self.banner = report.banner;
        self.tls_info = report.tls;
        self.quic_info = report.quic;
        self.os_guess = report.os;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_status_display() {
        assert_eq!(PortStatus::Open.to_string(), "open");
        assert_eq!(PortStatus::Closed.to_string(), "closed");
        assert_eq!(PortStatus::Filtered.to_string(), "filtered");
        assert_eq!(PortStatus::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_open_result() {
        let result = ScanResult::open("10.0.0.1", Port::new(22).unwrap(), Duration::from_millis(12));
        assert!(result.is_open());
        assert_eq!(result.protocol, Protocol::Tcp);
        assert_eq!(result.service.as_deref(), Some("ssh"));
        assert_eq!(result.response_time_ms, Some(12));
        assert!(result.banner.is_not_run());
    }

    #[test]
    fn test_not_run_probes_are_omitted() {
        let result = ScanResult::closed("10.0.0.1", Port::new(40000).unwrap());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "closed");
        assert_eq!(json["protocol"], "tcp");
        assert!(json.get("banner").is_none());
        assert!(json.get("service").is_none());
    }

    #[test]
    fn test_empty_banner_is_kept() {
        let report = ProbeReport {
            banner: ProbeOutcome::Found(String::new()),
            ..ProbeReport::default()
        };
        let result = ScanResult::open("h", Port::new(80).unwrap(), Duration::ZERO).with_report(report);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["banner"]["state"], "found");
        assert_eq!(json["banner"]["value"], "");
    }
}
