//! Core deterministic primitives.
//!
//! Hashing, time sources and turbo scaling. Nothing here knows about
//! subscribers or sessions.

pub mod clock;
pub mod hash;
pub mod turbo;

// Re-export core types
pub use clock::{Clock, SystemClock, VirtualClock};
pub use hash::{compute_event_hash, EventHash, EventHasher};
pub use turbo::TurboControl;
