//! TLS handshake probing.
//!
//! The handshake is performed with rustls and certificate trust checks
//! disabled: the goal is to learn what the peer offers, not to trust it.
//! Handshake signatures are still verified so the negotiated parameters are
//! the ones the peer really holds keys for.

use crate::error::{FailureKind, ProbeFailure};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, HandshakeKind, ProtocolVersion,
    SignatureScheme, SupportedProtocolVersion,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

/// ALPN protocols offered in the TLS probe.
const TLS_ALPN: &[&[u8]] = &[b"h2", b"http/1.1"];

/// Negotiated parameters of a TLS handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsInfo {
    pub version: Option<String>,
    pub cipher: Option<String>,
    /// rustls never negotiates compression, so this is always `None`.
    pub compression: Option<String>,
    pub alpn_protocol: Option<String>,
    pub session_reused: bool,
    pub certificate: Option<CertificateSummary>,
}

/// Fields of the peer's leaf certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub version: u32,
    pub serial_number: String,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub subject_alt_names: Vec<String>,
    pub extensions: Vec<CertificateExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateExtension {
    pub oid: String,
    pub critical: bool,
}

/// Capability to perform a TLS handshake and report what was negotiated.
#[async_trait]
pub trait TlsHandshaker: Send + Sync {
    /// Connect to `host:port` and handshake, presenting `server_name` as SNI.
    async fn handshake(
        &self,
        host: &str,
        server_name: &str,
        port: u16,
        limit: Duration,
    ) -> Result<TlsInfo, ProbeFailure>;
}

/// rustls-backed handshaker.
///
/// The client configuration, and with it the session cache, is shared by all
/// handshakes of a scan, so repeated handshakes to one peer can resume.
#[derive(Default)]
pub struct RustlsHandshaker {
    config: OnceLock<Result<Arc<ClientConfig>, rustls::Error>>,
}

impl RustlsHandshaker {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_config(&self) -> Result<Arc<ClientConfig>, ProbeFailure> {
        self.config
            .get_or_init(|| {
                insecure_client_config(rustls::DEFAULT_VERSIONS, TLS_ALPN).map(Arc::new)
            })
            .clone()
            .map_err(|e| ProbeFailure::new(FailureKind::Other, e.to_string()))
    }
}

#[async_trait]
impl TlsHandshaker for RustlsHandshaker {
    async fn handshake(
        &self,
        host: &str,
        server_name: &str,
        port: u16,
        limit: Duration,
    ) -> Result<TlsInfo, ProbeFailure> {
        let connector = TlsConnector::from(self.client_config()?);
        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|e| ProbeFailure::new(FailureKind::Other, e.to_string()))?;

        let handshake = async {
            let tcp = TcpStream::connect((host, port))
                .await
                .map_err(|e| ProbeFailure::from_io(&e))?;
            connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| ProbeFailure::new(FailureKind::Other, e.to_string()))
        };

        let stream = timeout(limit, handshake)
            .await
            .map_err(|_| ProbeFailure::timeout())??;

        let (_, connection) = stream.get_ref();
        Ok(describe(connection))
    }
}

fn describe(connection: &ClientConnection) -> TlsInfo {
    TlsInfo {
        version: connection.protocol_version().map(version_name),
        cipher: connection
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite())),
        compression: None,
        alpn_protocol: connection
            .alpn_protocol()
            .map(|p| String::from_utf8_lossy(p).into_owned()),
        session_reused: matches!(connection.handshake_kind(), Some(HandshakeKind::Resumed)),
        certificate: connection
            .peer_certificates()
            .and_then(|chain| chain.first())
            .and_then(|leaf| summarize_certificate(leaf.as_ref())),
    }
}

fn version_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_1 => "TLSv1.1".to_string(),
        ProtocolVersion::TLSv1_0 => "TLSv1".to_string(),
        other => format!("{:?}", other),
    }
}

/// Parse a DER certificate into its summary, `None` if it does not parse.
pub fn summarize_certificate(der: &[u8]) -> Option<CertificateSummary> {
    let (_, cert) = parse_x509_certificate(der).ok()?;

    let subject_alt_names = cert
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    GeneralName::IPAddress(bytes) => ip_from_bytes(bytes),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Some(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        version: cert.version().0 + 1,
        serial_number: cert
            .raw_serial()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect(),
        not_before: DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0),
        not_after: DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0),
        subject_alt_names,
        extensions: cert
            .extensions()
            .iter()
            .map(|ext| CertificateExtension {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
            })
            .collect(),
    })
}

fn ip_from_bytes(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes)
            .ok()
            .map(|b| std::net::Ipv4Addr::from(b).to_string()),
        16 => <[u8; 16]>::try_from(bytes)
            .ok()
            .map(|b| std::net::Ipv6Addr::from(b).to_string()),
        _ => None,
    }
}

/// Client configuration that accepts any certificate chain.
///
/// Shared by the TLS and QUIC probes.
pub(crate) fn insecure_client_config(
    versions: &[&'static SupportedProtocolVersion],
    alpn: &[&[u8]],
) -> Result<ClientConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(versions)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
        .with_no_client_auth();
    config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
    Ok(config)
}

#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
