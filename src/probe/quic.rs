//! QUIC handshake probing over UDP with quinn.

use crate::error::{FailureKind, ProbeFailure};
use crate::probe::tls::insecure_client_config;
use async_trait::async_trait;
use quinn::crypto::rustls::{HandshakeData, QuicClientConfig};
use quinn::{ClientConfig, ConnectionError, Endpoint};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::trace;

/// ALPN protocols offered in the QUIC probe.
const QUIC_ALPN: &[&[u8]] = &[b"h3", b"hq-interop"];

/// QUIC version 1 (RFC 9000), the only version attempted.
pub const QUIC_V1: u32 = 1;

/// Result of a QUIC handshake attempt.
///
/// A failed attempt is still reported, with `supported == false` and the
/// failure classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuicInfo {
    pub supported: bool,
    pub version: Option<u32>,
    pub alpn: Option<String>,
    /// Handshake duration in milliseconds, rounded to 4 decimals.
    pub handshake_ms: Option<f64>,
    /// quinn does not expose the negotiated suite, so this stays `None`.
    pub cipher: Option<String>,
    pub error: Option<FailureKind>,
    pub error_detail: Option<String>,
}

impl QuicInfo {
    pub fn failed(failure: ProbeFailure) -> Self {
        Self {
            supported: false,
            version: None,
            alpn: None,
            handshake_ms: None,
            cipher: None,
            error: Some(failure.kind),
            error_detail: Some(failure.detail),
        }
    }
}

/// Capability to perform a QUIC handshake and report what was negotiated.
#[async_trait]
pub trait QuicHandshaker: Send + Sync {
    async fn handshake(
        &self,
        host: &str,
        server_name: &str,
        port: u16,
        limit: Duration,
    ) -> Result<QuicInfo, ProbeFailure>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QuinnHandshaker;

impl QuinnHandshaker {
    pub fn new() -> Self {
        Self
    }

    fn client_config() -> Result<ClientConfig, ProbeFailure> {
        let tls = insecure_client_config(&[&rustls::version::TLS13], QUIC_ALPN)
            .map_err(|e| ProbeFailure::new(FailureKind::Other, e.to_string()))?;
        let crypto = QuicClientConfig::try_from(tls)
            .map_err(|e| ProbeFailure::new(FailureKind::Other, e.to_string()))?;
        Ok(ClientConfig::new(Arc::new(crypto)))
    }
}

#[async_trait]
impl QuicHandshaker for QuinnHandshaker {
    async fn handshake(
        &self,
        host: &str,
        server_name: &str,
        port: u16,
        limit: Duration,
    ) -> Result<QuicInfo, ProbeFailure> {
        let remote = timeout(limit, lookup(host, port))
            .await
            .map_err(|_| ProbeFailure::timeout())??;

        let local: SocketAddr = if remote.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let endpoint = Endpoint::client(local).map_err(|e| ProbeFailure::from_io(&e))?;

        let start = Instant::now();
        let connecting = endpoint
            .connect_with(Self::client_config()?, remote, server_name)
            .map_err(|e| ProbeFailure::new(FailureKind::Other, e.to_string()))?;

        let outcome = timeout(limit, connecting).await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Err(_) => Err(ProbeFailure::timeout()),
            Ok(Err(e)) => Err(classify(e)),
            Ok(Ok(connection)) => {
                let alpn = connection
                    .handshake_data()
                    .and_then(|data| data.downcast::<HandshakeData>().ok())
                    .and_then(|data| data.protocol)
                    .map(|p| String::from_utf8_lossy(&p).into_owned());
                connection.close(0u32.into(), b"");
                Ok(QuicInfo {
                    supported: true,
                    version: Some(QUIC_V1),
                    alpn,
                    handshake_ms: Some(round_ms(elapsed)),
                    cipher: None,
                    error: None,
                    error_detail: None,
                })
            }
        };

        endpoint.close(0u32.into(), b"");
        if let Err(failure) = &result {
            trace!(host, port, error = %failure, "quic handshake failed");
        }
        result
    }
}

async fn lookup(host: &str, port: u16) -> Result<SocketAddr, ProbeFailure> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ProbeFailure::new(FailureKind::DnsResolutionFailed, e.to_string()))?
        .next()
        .ok_or_else(|| {
            ProbeFailure::new(FailureKind::DnsResolutionFailed, format!("no address for {}", host))
        })
}

fn classify(err: ConnectionError) -> ProbeFailure {
    let kind = match &err {
        ConnectionError::TimedOut => FailureKind::Timeout,
        ConnectionError::Reset => FailureKind::ConnectionRefused,
        _ => FailureKind::Other,
    };
    ProbeFailure::new(kind, err.to_string())
}

fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 10_000.0).round() / 10_000.0
}
