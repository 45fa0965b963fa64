//! CSV output formatting.

use crate::probe::ProbeOutcome;
use crate::scanner::ScanResult;
use std::io;

const HEADER: [&str; 13] = [
    "target",
    "port",
    "status",
    "protocol",
    "service",
    "banner",
    "tls_version",
    "tls_cipher",
    "quic_supported",
    "ttl",
    "window",
    "response_time_ms",
    "timestamp",
];

/// Render results as CSV with a header row.
pub fn render_csv(results: &[ScanResult]) -> io::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADER)?;

    for result in results {
        let tls = result.tls_info.value();
        let os = result.os_guess.value();
        let quic_supported = match &result.quic_info {
            ProbeOutcome::Found(info) => info.supported.to_string(),
            _ => String::new(),
        };

        wtr.write_record([
            result.target.clone(),
            result.port.to_string(),
            result.status.to_string(),
            result.protocol.to_string(),
            result.service.clone().unwrap_or_default(),
            result.banner.value().cloned().unwrap_or_default(),
            tls.and_then(|t| t.version.clone()).unwrap_or_default(),
            tls.and_then(|t| t.cipher.clone()).unwrap_or_default(),
            quic_supported,
            optional(os.and_then(|o| o.ttl)),
            optional(os.and_then(|o| o.window)),
            optional(result.response_time_ms),
            result.timestamp.to_rfc3339(),
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| io::Error::other(e.to_string()))?;
    String::from_utf8(bytes).map_err(io::Error::other)
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::OsGuess;
    use crate::types::Port;
    use std::time::Duration;

    #[test]
    fn test_csv_rows() {
        let mut result = ScanResult::open("10.0.0.1", Port::new(22).unwrap(), Duration::from_millis(4));
        result.banner = ProbeOutcome::Found("SSH-2.0-OpenSSH, test".into());
        result.os_guess = ProbeOutcome::Found(OsGuess {
            ttl: Some(64),
            window: None,
        });

        let csv = render_csv(&[result]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), HEADER.join(","));

        let row = lines.next().unwrap();
        assert!(row.starts_with("10.0.0.1,22,open,tcp,ssh,\"SSH-2.0-OpenSSH, test\",,,,64,,4,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_empty() {
        assert_eq!(render_csv(&[]).unwrap().lines().count(), 1);
    }
}
