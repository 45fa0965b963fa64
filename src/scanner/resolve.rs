//! Per-item hostname resolution.

use crate::error::ResolveError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;
use tracing::warn;

/// Best-effort hostname to address resolution.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError>;
}

/// Resolver backed by trust-dns, using the system configuration when it can
/// be read (including the hosts file).
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsResolver {
    pub fn new(timeout: Duration) -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "system resolver configuration unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver, timeout }
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let response = timeout(self.timeout, self.resolver.lookup_ip(host))
            .await
            .map_err(|_| ResolveError::Timeout(host.to_string()))?
            .map_err(|e| ResolveError::Failed(host.to_string(), e.to_string()))?;

        response
            .iter()
            .next()
            .ok_or_else(|| ResolveError::NoAddresses(host.to_string()))
    }
}

/// Whether a target is already a literal address and needs no lookup.
pub fn is_literal(target: &str) -> bool {
    target.parse::<IpAddr>().is_ok()
}
