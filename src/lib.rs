//! # Reel Events
//!
//! Deterministic event distribution core for a real-time slot game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       REEL EVENTS                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── hash.rs      - Envelope integrity hashing (SHA-256)     │
//! │  ├── clock.rs     - Virtual and wall clocks                  │
//! │  └── turbo.rs     - Turbo speed divisor                      │
//! │                                                              │
//! │  events/          - Event model and dispatch                 │
//! │  ├── topic.rs     - Closed topic catalog, typed payloads     │
//! │  ├── envelope.rs  - Stamped publish record                   │
//! │  ├── bus.rs       - Synchronous pub/sub, global sequence     │
//! │  ├── scheduler.rs - Tick-driven delayed publishes            │
//! │  └── tracker.rs   - Per-topic statistics                     │
//! │                                                              │
//! │  replay/          - Session capture and audit                │
//! │  ├── session.rs   - Session format, export/import            │
//! │  ├── recorder.rs  - Curated recording subscriber             │
//! │  ├── verify.rs    - Hash recomputation                       │
//! │  └── player.rs    - Playback through the bus                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering Guarantee
//!
//! Every publish receives the next value of a single global counter
//! starting at 1, including publishes made from inside handlers and from
//! the scheduler. That sequence number, not any timestamp, orders the
//! stream. Scheduling and turbo only decide *when* a publish happens.
//!
//! ## Tamper Evidence
//!
//! Each envelope carries a SHA-256 hash over topic, canonical payload and
//! sequence. Recorded sessions keep those hashes, and verification
//! recomputes them, so any edit to a recorded event is detected.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod events;
pub mod replay;

// Re-export commonly used types
pub use crate::config::{CoreConfig, TimingConfig};
pub use crate::context::EventContext;
pub use crate::core::clock::{Clock, SystemClock, VirtualClock};
pub use crate::core::hash::{compute_event_hash, EventHash};
pub use crate::core::turbo::TurboControl;
pub use crate::error::{ConfigError, Error, IntegrityError, ReplayError};
pub use crate::events::{
    DispatchReport, EventBus, EventEnvelope, EventPayload, EventScheduler, EventStats,
    EventTracker, RepeatCount, ScheduleId, SubscriptionId, Topic, TopicEvent,
};
pub use crate::replay::{
    export_session, import_session, verify_session, verify_session_integrity, ReplayEvent,
    ReplayPlayer, ReplayRecorder, ReplaySession, SessionMetadata,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Host frame length at 60 Hz (ms).
pub const FRAME_MS: i64 = 16;
