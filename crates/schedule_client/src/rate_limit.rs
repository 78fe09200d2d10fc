//! Rate limiter for the scheduling API.
//!
//! The upstream is public and unauthenticated, so pacing is the only
//! courtesy we can extend. Read-only — there is no write path.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Token bucket applied to every upstream read.
#[derive(Debug, Clone)]
pub struct ReadLimiter {
    limiter: Arc<
        GovLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl ReadLimiter {
    /// Create with the given per-second read quota (clamped to at least 1).
    pub fn new(reads_per_sec: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(reads_per_sec.max(1)).expect("nonzero quota"));
        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        }
    }

    /// Wait until a read slot is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a slot without waiting. Returns true if acquired.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for ReadLimiter {
    fn default() -> Self {
        Self::new(20)
    }
}
