//! Time Sources
//!
//! Every timestamp in the core comes from a [`Clock`]. Hosts that need
//! reproducible runs (tests, replays, turbo) drive a [`VirtualClock`] once
//! per frame; production hosts may use the [`SystemClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Millisecond time source.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds.
    fn now_ms(&self) -> i64;
}

/// Wall-clock time (Unix epoch milliseconds).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock.
///
/// Cloning yields a handle to the same underlying time, so the host loop
/// and every component observe identical values.
#[derive(Debug, Default, Clone)]
pub struct VirtualClock {
    now: Arc<AtomicI64>,
}

impl VirtualClock {
    /// Create a clock starting at `start_ms`.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    /// Jump to an absolute time. Moving backwards is ignored.
    pub fn set(&self, now_ms: i64) {
        self.now.fetch_max(now_ms, Ordering::SeqCst);
    }

    /// Advance by `delta_ms` and return the new time.
    pub fn advance(&self, delta_ms: i64) -> i64 {
        let delta = delta_ms.max(0);
        self.now.fetch_add(delta, Ordering::SeqCst) + delta
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
