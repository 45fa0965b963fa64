//! Protocol probes run against endpoints found open.
//!
//! Each probe is independent and reports through [`ProbeOutcome`]; none of
//! them can fail the scan.

mod banner;
mod os;
mod quic;
mod tls;

#[cfg(test)]
mod test_certs;

pub use banner::{decode_banner, grab_banner};
pub use os::{fingerprint, OsGuess};
pub use quic::{QuicHandshaker, QuicInfo, QuinnHandshaker, QUIC_V1};
pub use tls::{
    summarize_certificate, CertificateExtension, CertificateSummary, RustlsHandshaker,
    TlsHandshaker, TlsInfo,
};

use crate::config::ScanConfig;
use crate::error::ProbeFailure;
use crate::scanner::Connector;
use crate::types::Port;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What a single probe produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ProbeOutcome<T> {
    /// The probe is disabled or does not apply to this port.
    NotRun,
    Found(T),
    Absent(ProbeFailure),
}

impl<T> Default for ProbeOutcome<T> {
    fn default() -> Self {
        Self::NotRun
    }
}

impl<T> From<Result<T, ProbeFailure>> for ProbeOutcome<T> {
    fn from(result: Result<T, ProbeFailure>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(failure) => Self::Absent(failure),
        }
    }
}

impl<T> ProbeOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            Self::Absent(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_not_run(&self) -> bool {
        matches!(self, Self::NotRun)
    }
}

/// Everything the pipeline learned about one endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub banner: ProbeOutcome<String>,
    pub tls: ProbeOutcome<TlsInfo>,
    pub quic: ProbeOutcome<QuicInfo>,
    pub os: ProbeOutcome<OsGuess>,
}

/// Runs the enabled probes in order: banner, TLS, QUIC, OS.
#[derive(Clone)]
pub struct ProbePipeline {
    config: Arc<ScanConfig>,
    connector: Arc<dyn Connector>,
    tls: Arc<dyn TlsHandshaker>,
    quic: Arc<dyn QuicHandshaker>,
}

impl ProbePipeline {
    pub fn new(config: Arc<ScanConfig>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            tls: Arc::new(RustlsHandshaker::new()),
            quic: Arc::new(QuinnHandshaker::new()),
        }
    }

    pub fn with_tls(mut self, tls: Arc<dyn TlsHandshaker>) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_quic(mut self, quic: Arc<dyn QuicHandshaker>) -> Self {
        self.quic = quic;
        self
    }

    /// Probe `host:port`. `server_name` is the name presented for SNI, which
    /// is the original hostname when `host` came from resolution.
    pub async fn run(&self, host: &str, server_name: &str, port: Port) -> ProbeReport {
        let cfg = &self.config;
        let limit = cfg.timeout();
        let p = port.as_u16();
        let mut report = ProbeReport::default();

        if cfg.grab_banners() {
            report.banner =
                grab_banner(self.connector.as_ref(), host, p, limit, cfg.banner_max_bytes())
                    .await
                    .into();
        }

        if cfg.scan_tls() && cfg.is_tls_port(port) {
            report.tls = self.tls.handshake(host, server_name, p, limit).await.into();
        }

        if cfg.scan_quic() && cfg.is_quic_port(port) {
            let info = match self.quic.handshake(host, server_name, p, limit).await {
                Ok(info) => info,
                Err(failure) => QuicInfo::failed(failure),
            };
            report.quic = ProbeOutcome::Found(info);
        }

        if cfg.os_fingerprint() {
            report.os = fingerprint(host, p, limit).await.into();
        }

        debug!(
            host,
            port = p,
            banner = report.banner.is_found(),
            tls = report.tls.is_found(),
            quic = report.quic.value().is_some_and(|q| q.supported),
            "probes finished"
        );
        report
    }
}
