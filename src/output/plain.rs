//! Plain text output formatting.
//!
//! One `[+] target:port OPEN` line per result, with detail lines for TLS,
//! QUIC and OS hints in verbose mode.

use crate::config::ScanConfig;
use crate::probe::ProbeOutcome;
use crate::scanner::{PortStatus, ScanResult};
use console::{style, Style};
use std::fmt::Write as _;
use std::time::Duration;

/// Banners are cut to this many characters when displayed.
const BANNER_DISPLAY_CHARS: usize = 100;

/// Render results in human-readable plain text.
pub fn render_plain(results: &[ScanResult], verbose: bool) -> String {
    let mut out = String::new();
    for result in results {
        render_result(&mut out, result, verbose);
    }
    out
}

fn render_result(out: &mut String, result: &ScanResult, verbose: bool) {
    let status_style = match result.status {
        PortStatus::Open => Style::new().green().bold(),
        PortStatus::Closed => Style::new().red(),
        PortStatus::Filtered | PortStatus::Unknown => Style::new().yellow(),
    };

    let _ = write!(
        out,
        "{} {}:{} {}",
        style("[+]").green(),
        result.target,
        result.port,
        status_style.apply_to(result.status.to_string().to_uppercase())
    );

    if let Some(banner) = result.banner.value().filter(|b| !b.is_empty()) {
        let _ = write!(out, " | Banner: {}", display_banner(banner));
    }

    if verbose {
        render_details(out, result);
    }
    out.push('\n');
}

fn render_details(out: &mut String, result: &ScanResult) {
    match &result.tls_info {
        ProbeOutcome::Found(tls) => {
            let _ = write!(
                out,
                "\n   TLS: {} {}",
                tls.version.as_deref().unwrap_or("?"),
                tls.cipher.as_deref().unwrap_or("?")
            );
            if let Some(alpn) = &tls.alpn_protocol {
                let _ = write!(out, " (ALPN {})", alpn);
            }
            if let Some(cert) = &tls.certificate {
                let _ = write!(out, "\n   Cert Subject: {}", cert.subject);
            }
        }
        ProbeOutcome::Absent(failure) => {
            let _ = write!(out, "\n   TLS: {}", style(format!("unavailable ({})", failure.kind)).dim());
        }
        ProbeOutcome::NotRun => {}
    }

    if let Some(quic) = result.quic_info.value() {
        if quic.supported {
            let _ = write!(out, "\n   QUIC: {}", style("Supported").green());
            if let Some(ms) = quic.handshake_ms {
                let _ = write!(out, " in {:.1}ms", ms);
            }
        } else {
            let _ = write!(out, "\n   QUIC: {}", style("Not supported").dim());
            if let Some(kind) = quic.error {
                let _ = write!(out, " ({})", kind);
            }
        }
    }

    if let Some(os) = result.os_guess.value() {
        let field = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        let _ = write!(out, "\n   OS hints: ttl={} window={}", field(os.ttl), field(os.window));
    }
}

/// Truncate to the display limit and escape line breaks so a banner stays on
/// its result line.
fn display_banner(banner: &str) -> String {
    banner
        .chars()
        .take(BANNER_DISPLAY_CHARS)
        .collect::<String>()
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(targets: usize, ports: usize, config: &ScanConfig) {
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("synapse").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!(
        "{} {} target(s), {} port(s)",
        style("•").dim(),
        style(targets).white().bold(),
        style(ports).white().bold()
    );
    eprintln!(
        "{} Concurrency: {} | Timeout: {:.2}s | Delay: {:.2}s",
        style("•").dim(),
        config.concurrency(),
        config.timeout().as_secs_f64(),
        config.delay().as_secs_f64()
    );
    if let Some(proxy) = config.proxy() {
        eprintln!("{} Proxy: {}", style("•").dim(), proxy);
    }
    eprintln!("{}", style("─".repeat(50)).dim());
}

/// Print the closing summary line.
pub fn print_summary(open: usize, elapsed: Duration, interrupted: bool) {
    eprintln!("{}", style("─".repeat(50)).dim());
    if interrupted {
        print_warning("scan interrupted, showing partial results");
    }
    eprintln!(
        "{} Scan completed in {:.2}s: {} open port(s) found",
        style("✓").green().bold(),
        elapsed.as_secs_f64(),
        style(open).green().bold()
    );
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    eprintln!("{} {}", style("✓").green().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeFailure;
    use crate::probe::{QuicInfo, TlsInfo};
    use crate::types::Port;

    fn open(port: u16) -> ScanResult {
        ScanResult::open("10.0.0.1", Port::new(port).unwrap(), Duration::from_millis(1))
    }

    fn plain(results: &[ScanResult], verbose: bool) -> String {
        console::strip_ansi_codes(&render_plain(results, verbose)).into_owned()
    }

    #[test]
    fn test_basic_line() {
        assert_eq!(plain(&[open(80)], false), "[+] 10.0.0.1:80 OPEN\n");
    }

    #[test]
    fn test_banner_is_truncated_for_display() {
        let mut result = open(22);
        result.banner = ProbeOutcome::Found("x".repeat(250));
        let text = plain(&[result], false);
        assert_eq!(text, format!("[+] 10.0.0.1:22 OPEN | Banner: {}\n", "x".repeat(100)));
    }

    #[test]
    fn test_empty_banner_is_not_shown() {
        let mut result = open(22);
        result.banner = ProbeOutcome::Found(String::new());
        assert_eq!(plain(&[result], false), "[+] 10.0.0.1:22 OPEN\n");
    }

    #[test]
    fn test_display_banner_escapes_newlines() {
        assert_eq!(display_banner("HTTP/1.1 200 OK\r\nServer: x"), "HTTP/1.1 200 OK\\r\\nServer: x");
    }

    #[test]
    fn test_verbose_details() {
        let mut result = open(443);
        result.tls_info = ProbeOutcome::Found(TlsInfo {
            version: Some("TLSv1.3".into()),
            cipher: Some("TLS13_AES_128_GCM_SHA256".into()),
            compression: None,
            alpn_protocol: None,
            session_reused: false,
            certificate: None,
        });
        result.quic_info = ProbeOutcome::Found(QuicInfo::failed(ProbeFailure::timeout()));

        let quiet = plain(&[result.clone()], false);
        assert!(!quiet.contains("TLS:"));

        let text = plain(&[result], true);
        assert!(text.contains("\n   TLS: TLSv1.3 TLS13_AES_128_GCM_SHA256"));
        assert!(text.contains("\n   QUIC: Not supported (timeout)"));
    }

    #[test]
    fn test_absent_tls_in_verbose() {
        let mut result = open(8443);
        result.tls_info = ProbeOutcome::Absent(ProbeFailure::timeout());
        assert!(plain(&[result], true).contains("TLS: unavailable (timeout)"));
    }
}
