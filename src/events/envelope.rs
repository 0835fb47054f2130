//! Event Envelope
//!
//! The stamped, immutable record of one publish. Only the bus creates
//! envelopes; subscribers receive them by reference and clone what they
//! want to keep.

use crate::core::hash::{compute_event_hash, EventHash};
use crate::events::topic::{EventPayload, Topic, TopicEvent};

/// One published event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEnvelope {
    topic: Topic,
    payload: EventPayload,
    sequence: u64,
    timestamp: i64,
    hash: EventHash,
}

impl EventEnvelope {
    /// Stamp a payload with its sequence number and time, computing the hash.
    pub(crate) fn stamp(payload: EventPayload, sequence: u64, timestamp: i64) -> Self {
        let topic = payload.topic();
        let hash = compute_event_hash(topic, &payload, sequence);
        Self {
            topic,
            payload,
            sequence,
            timestamp,
            hash,
        }
    }

    /// Event topic.
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Event payload.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Typed view of the payload.
    pub fn payload_as<T: TopicEvent>(&self) -> Option<&T> {
        T::from_payload(&self.payload)
    }

    /// Global sequence number (starts at 1).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Publish time in milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Integrity hash over topic, payload and sequence.
    pub fn hash(&self) -> &EventHash {
        &self.hash
    }

    /// Recompute the hash and compare with the stamped one.
    pub fn verify(&self) -> bool {
        compute_event_hash(self.topic, &self.payload, self.sequence) == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::topic::{BetChanged, SpinRequested};

    #[test]
    fn test_stamp_derives_topic_and_hash() {
        let envelope = EventEnvelope::stamp(BetChanged { bet: 100 }.into(), 3, 1_000);

        assert_eq!(envelope.topic(), Topic::BetChanged);
        assert_eq!(envelope.sequence(), 3);
        assert_eq!(envelope.timestamp(), 1_000);
        assert!(envelope.verify());
        assert_eq!(envelope.payload_as::<BetChanged>().unwrap().bet, 100);
        assert!(envelope.payload_as::<SpinRequested>().is_none());
    }

    #[test]
    fn test_timestamp_not_hashed() {
        let a = EventEnvelope::stamp(BetChanged { bet: 100 }.into(), 3, 1_000);
        let b = EventEnvelope::stamp(BetChanged { bet: 100 }.into(), 3, 9_000);
        assert_eq!(a.hash(), b.hash());
    }
}
