//! Event Model and Dispatch
//!
//! ## Module Structure
//!
//! - `topic`: Closed topic catalog and typed payloads
//! - `envelope`: Stamped, immutable publish record
//! - `bus`: Synchronous publish/subscribe with global sequencing
//! - `scheduler`: Tick-driven delayed and repeated publishes
//! - `tracker`: Per-topic dispatch statistics

pub mod bus;
pub mod envelope;
pub mod scheduler;
pub mod topic;
pub mod tracker;

// Re-export key types
pub use topic::{EventPayload, Topic, TopicEvent};
pub use envelope::EventEnvelope;
pub use bus::{DispatchReport, EventBus, SubscriptionId};
pub use scheduler::{EventScheduler, RepeatCount, ScheduleId};
pub use tracker::{EventStats, EventTracker};
