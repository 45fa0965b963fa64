//! JSON output formatting.

use crate::scanner::ScanResult;
use std::io;

/// Render results as a pretty-printed JSON array.
pub fn render_json(results: &[ScanResult]) -> io::Result<String> {
    serde_json::to_string_pretty(results).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use crate::types::Port;
    use std::time::Duration;

    #[test]
    fn test_json_shape() {
        let mut result = ScanResult::open("10.0.0.1", Port::new(80).unwrap(), Duration::from_millis(7));
        result.banner = ProbeOutcome::Found("HTTP/1.1 200 OK".into());

        let value: serde_json::Value = serde_json::from_str(&render_json(&[result]).unwrap()).unwrap();
        let first = &value[0];
        assert_eq!(first["target"], "10.0.0.1");
        assert_eq!(first["port"], 80);
        assert_eq!(first["status"], "open");
        assert_eq!(first["service"], "http");
        assert_eq!(first["response_time_ms"], 7);
        assert_eq!(first["banner"]["value"], "HTTP/1.1 200 OK");
        assert!(first.get("tls_info").is_none());
    }
}
