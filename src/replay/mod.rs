//! Session Recording and Audit
//!
//! - `session`: Session data model, export and import
//! - `recorder`: Curated bus subscriber capturing sessions
//! - `verify`: Hash recomputation over recorded events
//! - `player`: Re-publishing a session through the bus

pub mod player;
pub mod recorder;
pub mod session;
pub mod verify;

pub use session::{export_session, import_session, ReplayEvent, ReplaySession, SessionMetadata};
pub use recorder::ReplayRecorder;
pub use verify::{verify_session, verify_session_integrity, IntegrityReport};
pub use player::{replay_into, ReplayPlayer};
