//! Passive OS fingerprint hints.
//!
//! Reads what the local stack exposes about an established connection: the
//! IP TTL (hop limit for IPv6) and, on Linux, the TCP window clamp. Values
//! are advisory; no packets beyond a normal handshake are sent.

use crate::error::ProbeFailure;
use serde::{Deserialize, Serialize};
use socket2::SockRef;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsGuess {
    pub ttl: Option<u32>,
    pub window: Option<u32>,
}

/// Connect directly to `host:port` and read fingerprint hints.
///
/// Fails with `unavailable` when neither value can be read.
pub async fn fingerprint(host: &str, port: u16, limit: Duration) -> Result<OsGuess, ProbeFailure> {
    let stream = timeout(limit, TcpStream::connect((host, port)))
        .await
        .map_err(|_| ProbeFailure::timeout())?
        .map_err(|e| ProbeFailure::from_io(&e))?;

    let guess = OsGuess {
        ttl: ttl(&stream),
        window: window_clamp(&stream),
    };
    trace!(host, port, ?guess, "os hints");

    if guess.ttl.is_none() && guess.window.is_none() {
        return Err(ProbeFailure::unavailable("no fingerprint data exposed"));
    }
    Ok(guess)
}

fn ttl(stream: &TcpStream) -> Option<u32> {
    let sock = SockRef::from(stream);
    let ipv6 = stream.peer_addr().ok()?.is_ipv6();
    if ipv6 {
        sock.unicast_hops_v6().ok()
    } else {
        sock.ttl().ok()
    }
}

#[cfg(target_os = "linux")]
fn window_clamp(stream: &TcpStream) -> Option<u32> {
    use std::os::fd::AsRawFd;

    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: the fd is owned by `stream`, which outlives the call, and the
    // out-pointers reference live locals of the sizes passed.
    let rc = unsafe {
        libc::getsockopt(
            stream.as_raw_fd(),
            libc::IPPROTO_TCP,
            libc::TCP_WINDOW_CLAMP,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if rc == 0 && value > 0 {
        u32::try_from(value).ok()
    } else {
        None
    }
}

#[cfg(not(target_os = "linux"))]
fn window_clamp(_stream: &TcpStream) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_loopback_ttl() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let guess = fingerprint("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(guess.ttl.unwrap_or(0) > 0);
    }

    #[tokio::test]
    async fn test_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = fingerprint("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::ConnectionRefused);
    }
}
