//! Output formatting module.
//!
//! Renders scan results as plain text, JSON or CSV, to stdout or to a file.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::render_csv;
pub use json_format::render_json;
pub use plain::{
    print_error, print_scan_header, print_success, print_summary, print_warning,
    render_plain,
};

use crate::cli::OutputFormat;
use crate::scanner::ScanResult;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Render `results` in `format`. Only plain text depends on `verbose`.
pub fn render(results: &[ScanResult], format: OutputFormat, verbose: bool) -> io::Result<String> {
    match format {
        OutputFormat::Plain => Ok(render_plain(results, verbose)),
        OutputFormat::Json => render_json(results),
        OutputFormat::Csv => render_csv(results),
    }
}

/// Format and print scan results to stdout.
pub fn print_results(results: &[ScanResult], format: OutputFormat, verbose: bool) -> io::Result<()> {
    let rendered = render(results, format, verbose)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", rendered)?;
    if !rendered.is_empty() && !rendered.ends_with('\n') {
        writeln!(out)?;
    }
    out.flush()
}

/// Write a report file. Plain text reports always carry the verbose detail
/// lines and never carry terminal styling.
pub fn write_report(path: &Path, results: &[ScanResult], format: OutputFormat) -> io::Result<()> {
    let rendered = match format {
        OutputFormat::Plain => console::strip_ansi_codes(&render_plain(results, true)).into_owned(),
        other => render(results, other, true)?,
    };
    fs::write(path, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use std::time::Duration;

    fn sample() -> Vec<ScanResult> {
        vec![ScanResult::open("10.0.0.1", Port::new(22).unwrap(), Duration::from_millis(3))]
    }

    #[test]
    fn test_write_report_plain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        write_report(&path, &sample(), OutputFormat::Plain).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[+] 10.0.0.1:22 OPEN"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_write_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&path, &sample(), OutputFormat::Json).unwrap();

        let parsed: Vec<ScanResult> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].port, Port::new(22).unwrap());
        assert!(parsed[0].banner.is_not_run());
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[], OutputFormat::Plain, false).unwrap(), "");
        assert_eq!(render(&[], OutputFormat::Json, false).unwrap(), "[]");
    }

    #[test]
    fn test_write_report_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");
        assert!(write_report(&path, &sample(), OutputFormat::Csv).is_err());
    }
}
