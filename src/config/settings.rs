//! Application settings and paths.
//!
//! Defaults for the CLI live in a JSON settings file in the XDG config
//! directory. A missing file is not an error.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/synapse)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn new() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "synapse", "synapse").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default connection timeout in seconds.
    pub default_timeout_secs: f64,
    /// Default concurrency level.
    pub default_concurrency: usize,
    /// Ports on which the TLS probe runs.
    pub tls_ports: Vec<u16>,
    /// Ports on which the QUIC probe runs.
    pub quic_ports: Vec<u16>,
    /// Maximum bytes captured by the banner probe.
    pub banner_max_bytes: usize,
    /// Largest number of targets the CLI will expand in one run.
    pub max_targets: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: 1.0,
            default_concurrency: 500,
            tls_ports: vec![443, 8443, 993, 995],
            quic_ports: vec![443, 80],
            banner_max_bytes: 1024,
            max_targets: 1 << 24,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults.
    pub fn load() -> ConfigResult<Self> {
        let file = match Paths::new() {
            Ok(paths) => paths.settings_file(),
            Err(e) => {
                warn!(error = %e, "no configuration directory, using default settings");
                return Ok(Self::default());
            }
        };
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.default_concurrency, 500);
        assert_eq!(settings.default_timeout_secs, 1.0);
        assert_eq!(settings.tls_ports, vec![443, 8443, 993, 995]);
        assert_eq!(settings.max_targets, 16_777_216);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_concurrency": 64}}"#).unwrap();

        let settings = AppSettings::load_from(file.path()).unwrap();
        assert_eq!(settings.default_concurrency, 64);
        assert_eq!(settings.quic_ports, vec![443, 80]);
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            AppSettings::load_from(file.path()),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = AppSettings::load_from(Path::new("/nonexistent/synapse/settings.json"));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }
}
