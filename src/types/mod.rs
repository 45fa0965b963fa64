//! Core type definitions: ports, targets and the work items built from them.

mod port;
mod target;

pub use port::{expand_ports, parse_exclusions, Port, PortError, PortRange, PortSpec};
pub use target::{count_targets, expand_targets, TargetError, TargetSpec};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// One (target, port) pair to be probed.
///
/// The target is an opaque string (hostname or literal address) until the
/// scanner decides whether to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub target: String,
    pub port: Port,
}

impl WorkItem {
    pub fn new(target: impl Into<String>, port: Port) -> Self {
        Self {
            target: target.into(),
            port,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target, self.port)
    }
}

/// Build the cartesian work set, target-major, without duplicates.
///
/// Repeated targets and ports are dropped from each factor before the
/// product is taken, so the product itself is never deduplicated.
pub fn work_set<S: AsRef<str>>(targets: &[S], ports: &[Port]) -> Vec<WorkItem> {
    let targets = first_occurrences(targets.iter().map(AsRef::as_ref));
    let ports = first_occurrences(ports.iter().copied());

    let mut items = Vec::with_capacity(targets.len() * ports.len());
    for target in &targets {
        for &port in &ports {
            items.push(WorkItem::new(*target, port));
        }
    }
    items
}

fn first_occurrences<T: Copy + Eq + Hash>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}
