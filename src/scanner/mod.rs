//! Scanner module - coordinates the scan of a whole work set.
//!
//! Every (target, port) becomes one unit: optional name resolution, a
//! connectivity check, and the probe pipeline when the port is open. Units
//! are admitted through a [`ConcurrencyGate`] before they are spawned into a
//! `JoinSet`, so at most `concurrency` of them exist at any time.

mod connect;
mod gate;
mod rate_limiter;
mod resolve;
mod result;

pub use connect::{
    authority, bracket_host, connector_for, Connectivity, ConnectivityChecker, Connector, DirectConnector,
    HttpProxyConnector, Socks5Connector,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use rate_limiter::RateLimiter;
pub use resolve::{is_literal, DnsResolver, Resolve};
pub use result::{PortStatus, Protocol, ScanResult};

use crate::config::ScanConfig;
use crate::error::ParseError;
use crate::probe::{ProbePipeline, QuicHandshaker, TlsHandshaker};
use crate::types::{expand_ports, expand_targets, work_set, Port, WorkItem};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of a scan, reported at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Expanding,
    Scheduling,
    AwaitingAll,
    Aggregated,
}

/// Runs a scan with one configuration.
///
/// The scanner can be reused until it is cancelled; its gate keeps counting
/// across scans.
pub struct Scanner {
    config: Arc<ScanConfig>,
    connector: Arc<dyn Connector>,
    resolver: Option<Arc<dyn Resolve>>,
    tls: Option<Arc<dyn TlsHandshaker>>,
    quic: Option<Arc<dyn QuicHandshaker>>,
    gate: ConcurrencyGate,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        let connector = connector_for(config.proxy());
        let gate = ConcurrencyGate::new(config.concurrency());
        Self {
            config: Arc::new(config),
            connector,
            resolver: None,
            tls: None,
            quic: None,
            gate,
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    /// Replace the connection strategy derived from the proxy setting.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Resolver used when DNS resolution is enabled. Defaults to [`DnsResolver`].
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_tls_handshaker(mut self, tls: Arc<dyn TlsHandshaker>) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_quic_handshaker(mut self, quic: Arc<dyn QuicHandshaker>) -> Self {
        self.quic = Some(quic);
        self
    }

    /// Stop the scan when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Expand target and port specifications, then scan.
    ///
    /// Configured port exclusions are applied during expansion.
    pub async fn scan_specs<S: AsRef<str>>(
        &self,
        targets: &[S],
        ports: &str,
    ) -> Result<Vec<ScanResult>, ParseError> {
        let targets = expand_targets(targets)?;
        let ports = expand_ports(ports, self.config.excluded_ports())?;
        Ok(self.scan(&targets, &ports).await)
    }

    /// Scan every (target, port) pair and return the open endpoints, in no
    /// particular order.
    ///
    /// On cancellation, scheduling stops, the gate is closed, in-flight units
    /// are abandoned and whatever was already collected is returned.
    pub async fn scan<S: AsRef<str>>(&self, targets: &[S], ports: &[Port]) -> Vec<ScanResult> {
        debug!(phase = ?ScanPhase::Expanding, targets = targets.len(), ports = ports.len(), "scan phase");
        let items = work_set(targets, ports);
        let total = items.len();

        let ctx = Arc::new(self.unit_context());
        let progress = self.show_progress.then(|| progress_bar(total as u64));
        let mut set = JoinSet::new();
        let mut results = Vec::new();

        debug!(phase = ?ScanPhase::Scheduling, units = total, concurrency = self.gate.limit(), "scan phase");
        for item in items {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.gate.close();
                    break;
                }
                permit = self.gate.acquire() => match permit {
                    Some(permit) => permit,
                    None => break,
                },
            };

            let ctx = Arc::clone(&ctx);
            let cancel = self.cancel.clone();
            set.spawn(async move {
                let _permit = permit;
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = ctx.run(item) => Some(result),
                }
            });

            while let Some(joined) = set.try_join_next() {
                collect(joined, &mut results, progress.as_ref());
            }
        }

        debug!(phase = ?ScanPhase::AwaitingAll, pending = set.len(), "scan phase");
        while let Some(joined) = set.join_next().await {
            collect(joined, &mut results, progress.as_ref());
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Scan complete");
        }
        if self.cancel.is_cancelled() {
            warn!(collected = results.len(), "scan interrupted, returning partial results");
        }

        debug!(phase = ?ScanPhase::Aggregated, open = results.len(), peak = self.gate.peak(), "scan phase");
        results
    }

    fn unit_context(&self) -> UnitContext {
        let config = &self.config;

        let checker = ConnectivityChecker::new(Arc::clone(&self.connector), config.timeout())
            .with_delay(config.delay())
            .with_rate_limiter(config.rate_limit().and_then(RateLimiter::new));

        let mut pipeline = ProbePipeline::new(Arc::clone(config), Arc::clone(&self.connector));
        if let Some(tls) = &self.tls {
            pipeline = pipeline.with_tls(Arc::clone(tls));
        }
        if let Some(quic) = &self.quic {
            pipeline = pipeline.with_quic(Arc::clone(quic));
        }

        let resolver = config.resolve_dns().then(|| {
            self.resolver
                .clone()
                .unwrap_or_else(|| Arc::new(DnsResolver::new(config.timeout())) as Arc<dyn Resolve>)
        });

        UnitContext {
            checker,
            pipeline,
            resolver,
        }
    }
}

/// Shared, read-only state of every unit in a scan.
struct UnitContext {
    checker: ConnectivityChecker,
    pipeline: ProbePipeline,
    resolver: Option<Arc<dyn Resolve>>,
}

impl UnitContext {
    async fn run(&self, item: WorkItem) -> ScanResult {
        let host = match &self.resolver {
            Some(resolver) if !is_literal(&item.target) => {
                match resolver.resolve(&item.target).await {
                    Ok(ip) => ip.to_string(),
                    Err(e) => {
                        debug!(name = %item.target, error = %e, "resolution failed, using name as given");
                        item.target.clone()
                    }
                }
            }
            _ => item.target.clone(),
        };

        let connectivity = self.checker.check(&host, item.port).await;
        if !connectivity.open {
            return ScanResult::closed(host, item.port);
        }

        let report = self.pipeline.run(&host, &item.target, item.port).await;
        ScanResult::open(host, item.port, connectivity.elapsed).with_report(report)
    }
}

fn collect(
    joined: Result<Option<ScanResult>, JoinError>,
    results: &mut Vec<ScanResult>,
    progress: Option<&ProgressBar>,
) {
    match joined {
        Ok(Some(result)) => {
            if let Some(pb) = progress {
                pb.inc(1);
                if result.is_open() {
                    pb.set_message(format!("Found open port: {}:{}", result.target, result.port));
                }
            }
            if result.is_open() {
                results.push(result);
            }
        }
        // cancelled before finishing
        Ok(None) => {}
        Err(e) => warn!(error = %e, "scan unit failed"),
    }
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb
}
