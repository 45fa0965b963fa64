//! # synapse - a concurrent endpoint prober
//!
//! synapse checks which (host, port) endpoints accept TCP connections and
//! collects protocol metadata from the open ones: banner text, TLS handshake
//! parameters, QUIC support and passive OS hints.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use synapse::config::ScanConfig;
//! use synapse::scanner::Scanner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig::builder().with_tls(true).build().unwrap();
//!     let results = Scanner::new(config)
//!         .scan_specs(&["192.168.1.0/30"], "22,80,443")
//!         .await
//!         .unwrap();
//!
//!     for result in results {
//!         println!("{}:{} is {}", result.target, result.port, result.status);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Target and port specifications and the work set built from them
//! - [`scanner`] - Connectivity checks, the concurrency gate and the orchestrator
//! - [`probe`] - Banner, TLS, QUIC and OS-hint probes for open endpoints
//! - [`config`] - Scan configuration and the settings file
//! - [`error`] - Error types
//! - [`output`] - Plain, JSON and CSV renderers

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod probe;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{ConfigError, ParseError, ProbeFailure};
pub use probe::ProbeOutcome;
pub use scanner::{PortStatus, ScanResult, Scanner};
pub use types::{Port, PortSpec, TargetSpec, WorkItem};
