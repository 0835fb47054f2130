//! Replay Session Format
//!
//! A recorded session is an ordered list of captured events plus enough
//! metadata to identify the game and starting wallet. The exported form is
//! pretty-printed JSON with fixed field names:
//!
//! ```text
//! { id, gameId, startTime, endTime,
//!   metadata: { initialBalance, bet, seed },
//!   events: [ { timestamp, sequence, type, payload, roundId?, hash? } ] }
//! ```
//!
//! `sequence` is the only ordering authority. Relative timestamps may tie or
//! skew under batched delivery.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::hash::{hex_hash_opt, EventHash};
use crate::error::ReplayError;
use crate::events::envelope::EventEnvelope;
use crate::events::topic::{EventPayload, Topic};

/// Session identifier (UUID string).
pub type SessionId = String;

/// Starting conditions of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Wallet balance at start (minor units).
    pub initial_balance: i64,
    /// Stake at start (minor units).
    pub bet: i64,
    /// Outcome seed, when the game server shares one.
    #[serde(default)]
    pub seed: Option<String>,
}

/// One captured event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Milliseconds since session start.
    #[serde(rename = "timestamp")]
    pub timestamp_relative_ms: i64,

    /// Bus sequence number, copied verbatim.
    pub sequence: u64,

    /// Topic and payload, serialized as `type` and `payload`.
    #[serde(flatten)]
    pub payload: EventPayload,

    /// Round the event belongs to.
    #[serde(rename = "roundId", default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,

    /// Bus hash, copied verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_hash_opt")]
    pub hash: Option<EventHash>,
}

impl ReplayEvent {
    /// Capture an envelope. The payload is cloned; sequence and hash are
    /// taken as stamped by the bus.
    pub fn capture(envelope: &EventEnvelope, session_start: i64) -> Self {
        let payload = envelope.payload().clone();
        Self {
            timestamp_relative_ms: envelope.timestamp() - session_start,
            sequence: envelope.sequence(),
            round_id: payload.round_id().map(str::to_string),
            payload,
            hash: Some(*envelope.hash()),
        }
    }

    /// Event topic.
    pub fn topic(&self) -> Topic {
        self.payload.topic()
    }
}

/// A recorded gameplay session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySession {
    /// Session identifier.
    pub id: SessionId,
    /// Game identifier.
    pub game_id: String,
    /// Recording start (ms).
    pub start_time: i64,
    /// Recording end (ms); `None` while recording.
    pub end_time: Option<i64>,
    /// Starting conditions.
    pub metadata: SessionMetadata,
    /// Captured events in capture order.
    pub events: Vec<ReplayEvent>,
}

impl ReplaySession {
    /// Create an empty, open session.
    pub fn new(
        id: impl Into<SessionId>,
        game_id: impl Into<String>,
        start_time: i64,
        metadata: SessionMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            game_id: game_id.into(),
            start_time,
            end_time: None,
            metadata,
            events: Vec::new(),
        }
    }

    /// Append a captured envelope.
    pub fn record(&mut self, envelope: &EventEnvelope) {
        let event = ReplayEvent::capture(envelope, self.start_time);
        self.events.push(event);
    }

    /// Has recording stopped?
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Recording length, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Events ordered by sequence.
    pub fn sorted_events(&self) -> Vec<&ReplayEvent> {
        let mut events: Vec<&ReplayEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.sequence);
        events
    }

    /// Events of one round, ordered by sequence.
    pub fn events_for_round(&self, round_id: &str) -> Vec<&ReplayEvent> {
        self.sorted_events()
            .into_iter()
            .filter(|e| e.round_id.as_deref() == Some(round_id))
            .collect()
    }

    /// Captured events of `topic`.
    pub fn count_of(&self, topic: Topic) -> usize {
        self.events.iter().filter(|e| e.topic() == topic).count()
    }

    fn validate(&self) -> Result<(), ReplayError> {
        if self.id.is_empty() {
            return Err(ReplayError::Invalid("empty session id".into()));
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(ReplayError::Invalid(format!(
                    "endTime {} before startTime {}",
                    end, self.start_time
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for event in &self.events {
            if event.sequence == 0 {
                return Err(ReplayError::Invalid("sequence 0 is never assigned".into()));
            }
            if !seen.insert(event.sequence) {
                return Err(ReplayError::Invalid(format!(
                    "duplicate sequence {}",
                    event.sequence
                )));
            }
        }
        Ok(())
    }
}

/// Serialize a session to its canonical, diffable text form.
pub fn export_session(session: &ReplaySession) -> String {
    serde_json::to_string_pretty(session).expect("Session serialization should not fail")
}

/// Parse a session exported by [`export_session`].
///
/// Fails without returning anything partial if the text does not parse or
/// describes an impossible session.
pub fn import_session(text: &str) -> Result<ReplaySession, ReplayError> {
    let session: ReplaySession = serde_json::from_str(text)?;
    session.validate()?;
    Ok(session)
}
