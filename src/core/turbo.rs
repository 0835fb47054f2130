//! Turbo Time Scaling
//!
//! A settable speed multiplier applied as a divisor to configured delays
//! while turbo is active. Components only read it; the UI layer owns the
//! toggle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Smallest allowed multiplier (no scaling).
pub const MIN_MULTIPLIER: u32 = 1;

/// Shared turbo state.
///
/// Cloning yields a handle to the same state. Changing it only affects
/// delays read afterwards; values already computed are never revisited.
#[derive(Debug, Clone)]
pub struct TurboControl {
    inner: Arc<TurboInner>,
}

#[derive(Debug)]
struct TurboInner {
    multiplier: AtomicU32,
    active: AtomicBool,
}

impl Default for TurboControl {
    fn default() -> Self {
        Self::new(MIN_MULTIPLIER, false)
    }
}

impl TurboControl {
    /// Create turbo state. Multipliers below 1 are clamped to 1.
    pub fn new(multiplier: u32, active: bool) -> Self {
        Self {
            inner: Arc::new(TurboInner {
                multiplier: AtomicU32::new(multiplier.max(MIN_MULTIPLIER)),
                active: AtomicBool::new(active),
            }),
        }
    }

    /// Configured multiplier (always >= 1).
    pub fn multiplier(&self) -> u32 {
        self.inner.multiplier.load(Ordering::SeqCst)
    }

    /// Set the multiplier. Values below 1 are clamped to 1.
    pub fn set_multiplier(&self, multiplier: u32) {
        self.inner
            .multiplier
            .store(multiplier.max(MIN_MULTIPLIER), Ordering::SeqCst);
    }

    /// Is turbo active?
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Turn turbo on or off.
    pub fn set_active(&self, active: bool) {
        self.inner.active.store(active, Ordering::SeqCst);
    }

    /// Divisor currently in effect (1 while inactive).
    pub fn divisor(&self) -> u32 {
        if self.is_active() {
            self.multiplier()
        } else {
            MIN_MULTIPLIER
        }
    }

    /// Scale a delay in milliseconds by the current divisor.
    #[inline]
    pub fn scale(&self, delay_ms: i64) -> i64 {
        delay_ms / i64::from(self.divisor())
    }
}
