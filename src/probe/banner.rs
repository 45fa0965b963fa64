//! Banner grabbing.
//!
//! Opens a fresh connection, sends a minimal HTTP/1.1 request and reads
//! whatever comes back. If the first read yields nothing, a bare line
//! terminator is sent and the read is retried exactly once.

use crate::error::ProbeFailure;
use crate::scanner::{bracket_host, Connector};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Grab a banner from `host:port` through `connector`.
///
/// The full text is returned; truncation is left to whoever displays it.
pub async fn grab_banner(
    connector: &dyn Connector,
    host: &str,
    port: u16,
    limit: Duration,
    max_bytes: usize,
) -> Result<String, ProbeFailure> {
    let mut stream = timeout(limit, connector.connect(host, port))
        .await
        .map_err(|_| ProbeFailure::timeout())?
        .map_err(|e| ProbeFailure::from_io(&e))?;

    let result = exchange(&mut stream, host, limit, max_bytes).await;
    let _ = stream.shutdown().await;
    result
}

async fn exchange(
    stream: &mut TcpStream,
    host: &str,
    limit: Duration,
    max_bytes: usize,
) -> Result<String, ProbeFailure> {
    let request = format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", bracket_host(host));

    write(stream, request.as_bytes(), limit).await?;

    let mut buffer = vec![0u8; max_bytes];
    let mut n = read(stream, &mut buffer, limit).await?;

    if n == 0 {
        write(stream, b"\r\n", limit).await?;
        n = read(stream, &mut buffer, limit).await?;
    }

    Ok(decode_banner(&buffer[..n]))
}

async fn write(stream: &mut TcpStream, data: &[u8], limit: Duration) -> Result<(), ProbeFailure> {
    timeout(limit, stream.write_all(data))
        .await
        .map_err(|_| ProbeFailure::timeout())?
        .map_err(|e| ProbeFailure::from_io(&e))
}

async fn read(stream: &mut TcpStream, buffer: &mut [u8], limit: Duration) -> Result<usize, ProbeFailure> {
    timeout(limit, stream.read(buffer))
        .await
        .map_err(|_| ProbeFailure::timeout())?
        .map_err(|e| ProbeFailure::from_io(&e))
}

/// Decode raw banner bytes, replacing invalid UTF-8 and trimming whitespace.
pub fn decode_banner(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}
