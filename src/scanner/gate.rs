//! Concurrency gate bounding the number of in-flight scan units.
//!
//! A counting semaphore plus counters for the current and peak number of
//! admitted units. Permits are released when dropped, so every exit path of
//! a unit (completion, panic, cancellation) gives its slot back.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct GateStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    admitted: AtomicU64,
}

/// Counting admission control shared by every unit of a scan.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    stats: Arc<GateStats>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` units at once (minimum 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            stats: Arc::new(GateStats::default()),
        }
    }

    /// Wait for a free slot.
    ///
    /// Returns `None` once the gate has been closed.
    pub async fn acquire(&self) -> Option<GatePermit> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok()?;

        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);
        self.stats.admitted.fetch_add(1, Ordering::Relaxed);

        Some(GatePermit {
            _permit: permit,
            stats: Arc::clone(&self.stats),
        })
    }

    /// Refuse all further admissions. Outstanding permits stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Units currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously admitted units seen so far.
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }

    /// Total number of admissions.
    pub fn admitted(&self) -> u64 {
        self.stats.admitted.load(Ordering::Relaxed)
    }
}

/// A held gate slot; dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    stats: Arc<GateStats>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
