//! Global pacing of connection attempts.
//!
//! Token bucket shared by every unit of a scan. This is independent of the
//! per-attempt delay, which each unit sleeps on its own.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// A rate limiter for connection attempts.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate: NonZeroU32,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` attempts per second, or `None` for 0.
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        Some(Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_second(rate))),
            rate,
        })
    }

    /// Wait until the limiter allows another attempt.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    pub fn rate(&self) -> u32 {
        self.rate.get()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("rate", &self.rate).finish()
    }
}
