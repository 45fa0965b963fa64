//! Target specification types.
//!
//! Provides target parsing supporting:
//! - Single IP addresses (IPv4 and IPv6)
//! - Last-octet ranges (192.168.1.10-20)
//! - CIDR notation (192.168.1.0/24)
//! - Hostnames (example.com)
//!
//! Expansion produces plain address strings. Hostnames are kept as-is and
//! resolved lazily, per work item, by the scanner.

use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Error type for target parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: '{0}'")]
    InvalidFormat(String),
    #[error("invalid address range: '{0}'")]
    InvalidRange(String),
    #[error("invalid CIDR notation: '{0}'")]
    InvalidCidr(String),
    #[error("IPv6 CIDR range '{0}' too large: {1} addresses (max: {2})")]
    CidrTooLarge(String, u128, u128),
    #[error("empty target specification")]
    Empty,
}

/// A parsed target specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// An inclusive range over the last octet of an IPv4 address.
    Range { base: Ipv4Addr, end: u8 },
    /// A CIDR network range.
    Cidr(IpNetwork),
    /// A hostname, resolved later if at all.
    Hostname(String),
}

impl TargetSpec {
    /// Maximum number of addresses an IPv6 CIDR block may span. IPv4 blocks
    /// of any prefix length are accepted.
    pub const MAX_IPV6_CIDR_HOSTS: u128 = 1 << 20;

    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetError::Empty);
        }

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s
                .parse()
                .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;

            let size = network_size(&network);
            if network.is_ipv6() && size > Self::MAX_IPV6_CIDR_HOSTS {
                return Err(TargetError::CidrTooLarge(
                    s.to_string(),
                    size,
                    Self::MAX_IPV6_CIDR_HOSTS,
                ));
            }

            return Ok(Self::Cidr(network));
        }

        if let Some((base, end)) = s.split_once('-') {
            if let Ok(base) = base.parse::<Ipv4Addr>() {
                let end: u8 = end
                    .parse()
                    .map_err(|_| TargetError::InvalidRange(s.to_string()))?;
                if end < base.octets()[3] {
                    return Err(TargetError::InvalidRange(s.to_string()));
                }
                return Ok(Self::Range { base, end });
            }
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Expand into the ordered list of concrete address strings.
    ///
    /// IPv4 CIDR blocks up to /30 skip the network and broadcast addresses;
    /// /31 and /32 yield every address. IPv6 blocks skip the subnet-router
    /// address below /127.
    pub fn expand(&self) -> Vec<String> {
        match self {
            Self::Single(ip) => vec![ip.to_string()],

            Self::Range { base, end } => {
                let [a, b, c, start] = base.octets();
                (start..=*end)
                    .map(|d| Ipv4Addr::new(a, b, c, d).to_string())
                    .collect()
            }

            Self::Cidr(IpNetwork::V4(net)) => {
                let network = net.network();
                let broadcast = net.broadcast();
                net.iter()
                    .filter(|addr| net.prefix() > 30 || (*addr != network && *addr != broadcast))
                    .map(|addr| addr.to_string())
                    .collect()
            }

            Self::Cidr(IpNetwork::V6(net)) => {
                let network = net.network();
                net.iter()
                    .filter(|addr| net.prefix() >= 127 || *addr != network)
                    .map(|addr| addr.to_string())
                    .collect()
            }

            Self::Hostname(hostname) => vec![hostname.clone()],
        }
    }

    /// Number of addresses `expand` will yield.
    pub fn host_count(&self) -> u128 {
        match self {
            Self::Single(_) | Self::Hostname(_) => 1,
            Self::Range { base, end } => u128::from(*end - base.octets()[3]) + 1,
            Self::Cidr(IpNetwork::V4(net)) if net.prefix() <= 30 => {
                network_size(&IpNetwork::V4(*net)) - 2
            }
            Self::Cidr(IpNetwork::V6(net)) if net.prefix() < 127 => {
                network_size(&IpNetwork::V6(*net)) - 1
            }
            Self::Cidr(network) => network_size(network),
        }
    }
}

fn network_size(network: &IpNetwork) -> u128 {
    let host_bits = match network {
        IpNetwork::V4(net) => 32 - u32::from(net.prefix()),
        IpNetwork::V6(net) => 128 - u32::from(net.prefix()),
    };
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Range { base, end } => write!(f, "{}-{}", base, end),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

/// Parse and expand several target specifications.
///
/// Expansions are concatenated in input order; later duplicates are dropped.
pub fn expand_targets<S: AsRef<str>>(specs: &[S]) -> Result<Vec<String>, TargetError> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for spec in specs {
        for target in TargetSpec::parse(spec.as_ref())?.expand() {
            if seen.insert(target.clone()) {
                targets.push(target);
            }
        }
    }

    Ok(targets)
}

/// Upper bound on the number of targets `expand_targets` yields for `specs`,
/// computed without expanding them.
pub fn count_targets<S: AsRef<str>>(specs: &[S]) -> Result<u128, TargetError> {
    specs.iter().try_fold(0u128, |total, spec| {
        let spec = TargetSpec::parse(spec.as_ref())?;
        Ok(total.saturating_add(spec.host_count()))
    })
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    s.trim_end_matches('.').split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.starts_with(|c: char| c.is_ascii_alphanumeric())
            && label.ends_with(|c: char| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        let spec = TargetSpec::parse("192.168.1.1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V4(_))));
        assert_eq!(spec.expand(), vec!["192.168.1.1"]);
    }

    #[test]
    fn test_parse_ipv6() {
        let spec = TargetSpec::parse("::1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V6(_))));
    }

    #[test]
    fn test_parse_hostname() {
        let spec = TargetSpec::parse("example.com").unwrap();
        assert_eq!(spec, TargetSpec::Hostname("example.com".to_string()));
        assert_eq!(spec.expand(), vec!["example.com"]);
    }

    #[test]
    fn test_last_octet_range() {
        let spec = TargetSpec::parse("10.0.0.5-8").unwrap();
        assert_eq!(
            spec.expand(),
            vec!["10.0.0.5", "10.0.0.6", "10.0.0.7", "10.0.0.8"]
        );
        assert_eq!(spec.host_count(), 4);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert_eq!(
            TargetSpec::parse("10.0.0.9-3"),
            Err(TargetError::InvalidRange("10.0.0.9-3".to_string()))
        );
        assert!(matches!(
            TargetSpec::parse("10.0.0.1-300"),
            Err(TargetError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_cidr_excludes_network_and_broadcast() {
        for prefix in 20..=30u32 {
            let spec = TargetSpec::parse(&format!("172.16.0.0/{}", prefix)).unwrap();
            let hosts = spec.expand();
            assert_eq!(hosts.len() as u128, (1u128 << (32 - prefix)) - 2);
            assert_eq!(hosts.len() as u128, spec.host_count());
            assert!(!hosts.contains(&"172.16.0.0".to_string()));
        }

        let hosts = TargetSpec::parse("192.168.1.0/24").unwrap().expand();
        assert_eq!(hosts.first().map(String::as_str), Some("192.168.1.1"));
        assert_eq!(hosts.last().map(String::as_str), Some("192.168.1.254"));
    }

    #[test]
    fn test_cidr_host_bits_are_normalized() {
        let hosts = TargetSpec::parse("10.1.1.77/30").unwrap().expand();
        assert_eq!(hosts, vec!["10.1.1.77", "10.1.1.78"]);
    }

    #[test]
    fn test_small_cidr_blocks() {
        assert_eq!(TargetSpec::parse("10.0.0.4/31").unwrap().expand().len(), 2);
        assert_eq!(
            TargetSpec::parse("10.0.0.4/32").unwrap().expand(),
            vec!["10.0.0.4"]
        );
    }

    #[test]
    fn test_large_ipv4_blocks_are_accepted() {
        let spec = TargetSpec::parse("10.0.0.0/8").unwrap();
        assert_eq!(spec.host_count(), (1 << 24) - 2);
        assert_eq!(
            TargetSpec::parse("0.0.0.0/0").unwrap().host_count(),
            (1u128 << 32) - 2
        );

        let hosts = expand_targets(&["10.0.0.0/11"]).unwrap();
        assert_eq!(hosts.len(), (1 << 21) - 2);
        assert_eq!(hosts.first().map(String::as_str), Some("10.0.0.1"));
        assert_eq!(hosts.last().map(String::as_str), Some("10.31.255.254"));
    }

    #[test]
    fn test_count_targets() {
        assert_eq!(count_targets(&["10.0.0.0/8", "10.0.0.1", "example.com"]).unwrap(), (1 << 24));
        assert_eq!(count_targets::<&str>(&[]).unwrap(), 0);
        assert!(count_targets(&["10.0.0.0/33"]).is_err());
    }

    #[test]
    fn test_cidr_errors() {
        assert!(matches!(
            TargetSpec::parse("2001:db8::/64"),
            Err(TargetError::CidrTooLarge(..))
        ));
        assert_eq!(
            TargetSpec::parse("10.0.0.0/33"),
            Err(TargetError::InvalidCidr("10.0.0.0/33".to_string()))
        );
    }

    #[test]
    fn test_invalid_targets() {
        assert!(matches!(
            TargetSpec::parse("-bad-.com"),
            Err(TargetError::InvalidFormat(_))
        ));
        assert_eq!(TargetSpec::parse("   "), Err(TargetError::Empty));
    }

    #[test]
    fn test_expand_targets_dedups_across_specs() {
        let targets = expand_targets(&["10.0.0.1-3", "10.0.0.2", "localhost"]).unwrap();
        assert_eq!(targets, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "localhost"]);
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("my-server"));
        assert!(is_valid_hostname("example.com."));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-invalid.com"));
        assert!(!is_valid_hostname("under_score.com"));
    }
}
