//! Envelope Hashing for Verification
//!
//! Provides deterministic hashing of published events for:
//! - Tamper detection on recorded sessions
//! - Replay validation after export/import
//!
//! The same function is used by the bus at publish time and by the
//! verifier when auditing a session, so a recomputed hash matches the
//! stored one exactly when topic, payload and sequence are untouched.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::events::topic::{EventPayload, Topic};

/// Hash output type (256 bits / 32 bytes)
pub type EventHash = [u8; 32];

/// Domain separator for envelope hashes.
pub const ENVELOPE_DOMAIN: &[u8] = b"REEL_EVENTS_ENVELOPE_V1";

/// Deterministic hasher for event envelopes.
///
/// Wraps SHA-256 with helpers for the fields that make up an envelope.
/// Order of updates is critical for determinism.
pub struct EventHasher {
    hasher: Sha256,
}

impl EventHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for event envelopes.
    pub fn for_envelope() -> Self {
        Self::new(ENVELOPE_DOMAIN)
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a string, terminated by a zero byte.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_bytes(value.as_bytes());
        self.update_u8(0);
    }

    /// Update with the canonical JSON form of a value, length-prefixed.
    pub fn update_canonical<T: Serialize>(&mut self, value: &T) -> serde_json::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.update_u64(bytes.len() as u64);
        self.update_bytes(&bytes);
        Ok(())
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> EventHash {
        self.hasher.finalize().into()
    }
}

/// Compute the integrity hash of one event.
///
/// Hashes, in order: the envelope domain, the topic wire name, the
/// length-prefixed canonical JSON of the payload, and the sequence number.
pub fn compute_event_hash(topic: Topic, payload: &EventPayload, sequence: u64) -> EventHash {
    let mut hasher = EventHasher::for_envelope();
    hasher.update_str(topic.as_str());
    // Payloads are plain structs of strings, integers and vectors.
    hasher
        .update_canonical(payload)
        .expect("Payload serialization should not fail");
    hasher.update_u64(sequence);
    hasher.finalize()
}

/// Encode a hash as lowercase hex.
pub fn hash_to_hex(hash: &EventHash) -> String {
    hex::encode(hash)
}

/// Decode a hash from hex. Returns `None` unless exactly 32 bytes decode.
pub fn hash_from_hex(s: &str) -> Option<EventHash> {
    let bytes = hex::decode(s).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Some(hash)
}

/// Serde adapter storing `Option<EventHash>` as an optional hex string.
pub mod hex_hash_opt {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{hash_from_hex, hash_to_hex, EventHash};

    /// Serialize as hex (or null).
    pub fn serialize<S: Serializer>(hash: &Option<EventHash>, s: S) -> Result<S::Ok, S::Error> {
        match hash {
            Some(h) => s.serialize_some(&hash_to_hex(h)),
            None => s.serialize_none(),
        }
    }

    /// Deserialize from hex (or null).
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<EventHash>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) => hash_from_hex(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid event hash: {s:?}"))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
