//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` handle the `80`, `20-25` and `22,80,8000-8010`
//! forms, and `PortSpec::expand` applies an exclusion set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| PortError::OutOfRange(value.to_string()))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port specification parsing.
///
/// Every variant carries the token that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port '{0}' is out of valid range (1-65535)")]
    OutOfRange(String),
    #[error("invalid port number: '{0}'")]
    InvalidFormat(String),
    #[error("invalid port range '{0}': start is greater than end")]
    InvalidRange(String),
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a new port range. `start` must not exceed `end`.
    pub fn new(start: Port, end: Port) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: Port) -> bool {
        self.start <= port && port <= self.end
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A complete port specification that can contain multiple ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// All requested ports, sorted and deduplicated.
    pub fn to_ports(&self) -> Vec<Port> {
        self.to_set().into_iter().collect()
    }

    /// All requested ports as an ordered set.
    pub fn to_set(&self) -> BTreeSet<Port> {
        self.ranges.iter().flat_map(|r| r.iter()).collect()
    }

    /// Ascending, deduplicated ports with every excluded port removed.
    ///
    /// Exclusions apply the same way whether a port was listed explicitly or
    /// came from a range.
    pub fn expand(&self, excluded: &BTreeSet<Port>) -> Vec<Port> {
        self.to_set().difference(excluded).copied().collect()
    }

    /// Number of unique ports requested.
    pub fn count(&self) -> usize {
        self.to_set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, port: Port) -> bool {
        self.ranges.iter().any(|r| r.contains(port))
    }
}

fn parse_port_token(token: &str) -> Result<Port, PortError> {
    let value: u32 = token
        .trim()
        .parse()
        .map_err(|_| PortError::InvalidFormat(token.to_string()))?;
    u16::try_from(value)
        .ok()
        .and_then(Port::new)
        .ok_or_else(|| PortError::OutOfRange(token.trim().to_string()))
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(PortError::InvalidFormat(part.to_string()));
            }

            match part.split_once('-') {
                Some((start, end)) => {
                    if end.contains('-') {
                        return Err(PortError::InvalidFormat(part.to_string()));
                    }
                    let start = parse_port_token(start)?;
                    let end = parse_port_token(end)?;
                    let range = PortRange::new(start, end)
                        .ok_or_else(|| PortError::InvalidRange(part.to_string()))?;
                    spec.add_range(range);
                }
                None => spec.add_port(parse_port_token(part)?),
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse an exclusion list such as `"21,23"` or `"135-139,445"`.
///
/// An empty string excludes nothing.
pub fn parse_exclusions(s: &str) -> Result<BTreeSet<Port>, PortError> {
    if s.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    Ok(s.parse::<PortSpec>()?.to_set())
}

/// Parse a port specification and apply exclusions in one step.
pub fn expand_ports(spec: &str, excluded: &BTreeSet<Port>) -> Result<Vec<Port>, PortError> {
    Ok(spec.parse::<PortSpec>()?.expand(excluded))
}
