//! Configuration management for synapse.
//!
//! `AppSettings` holds file-backed defaults; `ScanConfig` is the validated,
//! immutable configuration of a single run.

mod scan;
mod settings;

pub use scan::{secs, ProxyConfig, ScanConfig, ScanConfigBuilder};
pub use settings::{AppSettings, Paths};
