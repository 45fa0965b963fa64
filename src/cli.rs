//! Command-line interface definitions for synapse.
//!
//! Uses `clap` derive macros for declarative argument parsing.

use crate::config::{secs, AppSettings, ProxyConfig, ScanConfig, ScanConfigBuilder};
use crate::error::ConfigResult;
use crate::error::ConfigError;
use crate::types::{count_targets, parse_exclusions};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Concurrent endpoint prober: connectivity, banners, TLS, QUIC and OS hints.
#[derive(Parser, Debug)]
#[command(name = "synapse")]
#[command(version)]
#[command(about = "A concurrent endpoint prober", long_about = None)]
pub struct Args {
    /// Targets to scan
    ///
    /// Examples:
    ///   192.168.1.1        Single IP address
    ///   example.com        Hostname
    ///   10.0.0.1-20        Last-octet range
    ///   192.168.1.0/24     CIDR range
    #[arg(value_name = "TARGETS", required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Ports to scan (e.g., "80", "80,443", "1-1000", "22,80,443,8000-9000")
    #[arg(short, long)]
    pub ports: String,

    /// Connection timeout in seconds [default: from settings, 1.0]
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Maximum number of concurrent probes [default: from settings, 500]
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Delay before each connection attempt, in seconds
    #[arg(long, default_value_t = 0.0)]
    pub delay: f64,

    /// Global limit on connection attempts per second (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub rate: u32,

    /// Disable banner grabbing
    #[arg(long)]
    pub no_banner: bool,

    /// Probe TLS on TLS-likely ports
    #[arg(long)]
    pub tls: bool,

    /// Probe QUIC on QUIC-likely ports
    #[arg(long)]
    pub quic: bool,

    /// Resolve hostnames before connecting
    #[arg(long)]
    pub resolve: bool,

    /// Collect passive OS fingerprint hints
    #[arg(long)]
    pub os_guess: bool,

    /// Ports to leave out, same syntax as --ports
    #[arg(long, value_name = "PORTS")]
    pub exclude_ports: Option<String>,

    /// Proxy URL (http://host:port or socks5://[user:pass@]host:port)
    #[arg(long, env = "SYNAPSE_PROXY")]
    pub proxy: Option<String>,

    /// Also write the results to a file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Verbose output (progress, TLS/QUIC details, debug logs)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print results only
    #[arg(short, long)]
    pub quiet: bool,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Merge command-line flags over `settings` into a validated config.
    pub fn scan_config(&self, settings: &AppSettings) -> ConfigResult<ScanConfig> {
        let mut builder = ScanConfigBuilder::from_settings(settings);

        if let Some(timeout) = self.timeout {
            builder = builder.with_timeout(secs(timeout, "timeout")?);
        }
        if let Some(concurrency) = self.concurrency {
            builder = builder.with_concurrency(concurrency);
        }

        let excluded = match &self.exclude_ports {
            Some(spec) => parse_exclusions(spec)?,
            None => Default::default(),
        };
        let proxy = self
            .proxy
            .as_deref()
            .map(str::parse::<ProxyConfig>)
            .transpose()?;

        builder
            .with_delay(secs(self.delay, "delay")?)
            .with_rate_limit(self.rate)
            .with_banners(!self.no_banner)
            .with_tls(self.tls)
            .with_quic(self.quic)
            .with_dns_resolution(self.resolve)
            .with_os_fingerprint(self.os_guess)
            .with_excluded_ports(excluded)
            .with_proxy(proxy)
            .build()
    }

    /// Check the requested targets against the `max_targets` setting before
    /// anything is expanded. Returns the upper bound on the target count.
    pub fn check_target_budget(&self, settings: &AppSettings) -> ConfigResult<u128> {
        let count = count_targets(&self.targets)?;
        if count > u128::from(settings.max_targets) {
            return Err(ConfigError::TooManyTargets {
                count,
                max: settings.max_targets,
            });
        }
        Ok(count)
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("synapse").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_minimal_invocation() {
        let args = parse(&["127.0.0.1", "-p", "80"]);
        assert_eq!(args.targets, vec!["127.0.0.1"]);
        assert_eq!(args.format, OutputFormat::Plain);

        let config = args.scan_config(&AppSettings::default()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.concurrency(), 500);
        assert!(config.grab_banners());
        assert!(!config.scan_tls());
    }

    #[test]
    fn test_ports_are_required() {
        assert!(Args::try_parse_from(["synapse", "127.0.0.1"]).is_err());
        assert!(Args::try_parse_from(["synapse", "-p", "80"]).is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let args = parse(&[
            "10.0.0.1",
            "example.com",
            "-p",
            "1-100",
            "-t",
            "0.5",
            "-c",
            "16",
            "--no-banner",
            "--tls",
            "--resolve",
            "--exclude-ports",
            "22,25",
            "--proxy",
            "socks5://127.0.0.1:9050",
            "--format",
            "json",
        ]);
        let settings = AppSettings {
            default_concurrency: 64,
            ..AppSettings::default()
        };
        let config = args.scan_config(&settings).unwrap();

        assert_eq!(args.targets.len(), 2);
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.concurrency(), 16);
        assert!(!config.grab_banners());
        assert!(config.scan_tls());
        assert!(config.resolve_dns());
        assert!(config.excluded_ports().contains(&Port::new(25).unwrap()));
        assert_eq!(config.proxy().map(|p| p.addr()), Some("127.0.0.1:9050"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_settings_fill_in_defaults() {
        let args = parse(&["127.0.0.1", "-p", "80"]);
        let settings = AppSettings {
            default_concurrency: 64,
            ..AppSettings::default()
        };
        assert_eq!(args.scan_config(&settings).unwrap().concurrency(), 64);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let zero = parse(&["127.0.0.1", "-p", "80", "-c", "0"]);
        assert!(matches!(
            zero.scan_config(&AppSettings::default()),
            Err(ConfigError::Invalid(_))
        ));

        let negative = parse(&["127.0.0.1", "-p", "80", "--delay=-1"]);
        assert!(negative.scan_config(&AppSettings::default()).is_err());

        let bad_proxy = parse(&["127.0.0.1", "-p", "80", "--proxy", "ftp://x:21"]);
        assert!(matches!(
            bad_proxy.scan_config(&AppSettings::default()),
            Err(ConfigError::InvalidProxy(..))
        ));

        let bad_exclusion = parse(&["127.0.0.1", "-p", "80", "--exclude-ports", "x"]);
        assert!(matches!(
            bad_exclusion.scan_config(&AppSettings::default()),
            Err(ConfigError::Ports(_))
        ));
    }

    #[test]
    fn test_target_budget() {
        let args = parse(&["10.0.0.0/8", "-p", "80"]);
        assert_eq!(
            args.check_target_budget(&AppSettings::default()).unwrap(),
            (1 << 24) - 2
        );

        let small = AppSettings {
            max_targets: 1024,
            ..AppSettings::default()
        };
        assert!(matches!(
            args.check_target_budget(&small),
            Err(ConfigError::TooManyTargets { max: 1024, .. })
        ));

        let within = parse(&["192.168.1.0/24", "example.com", "-p", "80"]);
        assert_eq!(within.check_target_budget(&small).unwrap(), 255);

        let malformed = parse(&["10.0.0.0/40", "-p", "80"]);
        assert!(matches!(
            malformed.check_target_budget(&small),
            Err(ConfigError::Targets(_))
        ));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["synapse", "h", "-p", "80", "-v", "-q"]).is_err());
    }
}
