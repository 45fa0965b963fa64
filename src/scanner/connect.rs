//! Connectivity checking.
//!
//! A port is open when a full TCP handshake with it completes inside the
//! timeout. How the connection is established is a [`Connector`] strategy:
//! directly, through an HTTP CONNECT proxy, or through a SOCKS5 proxy.

use crate::config::ProxyConfig;
use crate::scanner::rate_limiter::RateLimiter;
use crate::types::Port;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_socks::tcp::Socks5Stream;
use tracing::trace;

/// Longest proxy response header accepted for an HTTP CONNECT.
const MAX_CONNECT_RESPONSE: usize = 8192;

/// Strategy for opening a TCP stream to `host:port`.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream>;
}

/// Plain OS-level connect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectConnector;

#[async_trait]
impl Connector for DirectConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        TcpStream::connect((host, port)).await
    }
}

/// Tunnel through an HTTP proxy with `CONNECT host:port`.
#[derive(Debug, Clone)]
pub struct HttpProxyConnector {
    proxy_addr: String,
}

impl HttpProxyConnector {
    pub fn new(proxy_addr: impl Into<String>) -> Self {
        Self {
            proxy_addr: proxy_addr.into(),
        }
    }
}

#[async_trait]
impl Connector for HttpProxyConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let mut stream = TcpStream::connect(self.proxy_addr.as_str()).await?;
        let target = authority(host, port);
        let request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;

        // Read byte by byte so no tunneled payload is consumed with the header.
        let mut header = Vec::with_capacity(128);
        let mut byte = [0u8; 1];
        while !header.ends_with(b"\r\n\r\n") {
            if header.len() >= MAX_CONNECT_RESPONSE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "proxy response header too long",
                ));
            }
            if stream.read(&mut byte).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "proxy closed the connection",
                ));
            }
            header.push(byte[0]);
        }

        let status = parse_connect_status(&header).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "malformed proxy response")
        })?;
        if !(200..300).contains(&status) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("proxy refused CONNECT with status {}", status),
            ));
        }

        Ok(stream)
    }
}

/// Tunnel through a SOCKS5 proxy.
#[derive(Clone)]
pub struct Socks5Connector {
    proxy_addr: String,
    auth: Option<(String, String)>,
}

impl Socks5Connector {
    pub fn new(proxy_addr: impl Into<String>, auth: Option<(String, String)>) -> Self {
        Self {
            proxy_addr: proxy_addr.into(),
            auth,
        }
    }
}

impl fmt::Debug for Socks5Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socks5Connector")
            .field("proxy_addr", &self.proxy_addr)
            .field("auth", &self.auth.as_ref().map(|(user, _)| user))
            .finish()
    }
}

#[async_trait]
impl Connector for Socks5Connector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let proxy = self.proxy_addr.as_str();
        let stream = match &self.auth {
            Some((user, pass)) => {
                Socks5Stream::connect_with_password(proxy, (host, port), user, pass).await
            }
            None => Socks5Stream::connect(proxy, (host, port)).await,
        }
        .map_err(io::Error::other)?;

        Ok(stream.into_inner())
    }
}

/// Pick the connection strategy for an optional proxy.
pub fn connector_for(proxy: Option<&ProxyConfig>) -> Arc<dyn Connector> {
    match proxy {
        None => Arc::new(DirectConnector),
        Some(ProxyConfig::Http { addr }) => Arc::new(HttpProxyConnector::new(addr.clone())),
        Some(ProxyConfig::Socks5 { addr, auth }) => {
            Arc::new(Socks5Connector::new(addr.clone(), auth.clone()))
        }
    }
}

/// `host:port`, bracketing IPv6 literals.
pub fn authority(host: &str, port: u16) -> String {
    format!("{}:{}", bracket_host(host), port)
}

/// Wrap a bare IPv6 literal in brackets for use in a URI authority or a
/// `Host` header. Other hosts pass through unchanged.
pub fn bracket_host(host: &str) -> Cow<'_, str> {
    if host.contains(':') && !host.starts_with('[') {
        Cow::Owned(format!("[{}]", host))
    } else {
        Cow::Borrowed(host)
    }
}

fn parse_connect_status(header: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(header).ok()?;
    let mut parts = text.lines().next()?.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Outcome of one connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    pub open: bool,
    /// Time spent on the connection attempt itself, excluding any delay.
    pub elapsed: Duration,
}

/// Classifies a single (host, port) as open or closed.
///
/// One timed attempt, no retries. Every failure (refused, timeout, DNS,
/// unreachable, proxy error) counts as closed.
#[derive(Debug, Clone)]
pub struct ConnectivityChecker {
    connector: Arc<dyn Connector>,
    timeout: Duration,
    delay: Duration,
    limiter: Option<RateLimiter>,
}

impl ConnectivityChecker {
    pub fn new(connector: Arc<dyn Connector>, timeout: Duration) -> Self {
        Self {
            connector,
            timeout,
            delay: Duration::ZERO,
            limiter: None,
        }
    }

    /// Idle this long before every attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub async fn check(&self, host: &str, port: Port) -> Connectivity {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        let start = Instant::now();
        let open = match timeout(self.timeout, self.connector.connect(host, port.as_u16())).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                trace!(host, port = port.as_u16(), error = %e, "connect failed");
                false
            }
            Err(_) => {
                trace!(host, port = port.as_u16(), "connect timed out");
                false
            }
        };

        Connectivity {
            open,
            elapsed: start.elapsed(),
        }
    }
}
