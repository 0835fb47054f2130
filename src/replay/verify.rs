//! Session Integrity Verification
//!
//! Recomputes every stored hash from topic, payload and sequence using the
//! same function the bus used at publish time. Events are checked in
//! sequence order, never timestamp order.
//!
//! An event without a hash is unverifiable: it is logged and reported but
//! does not fail the check. Any mismatch fails it.

use tracing::{debug, warn};

use crate::core::hash::{compute_event_hash, hash_to_hex};
use crate::error::IntegrityError;
use crate::replay::session::ReplaySession;

/// Result of a passing integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Events whose hash was recomputed and matched.
    pub verified: usize,
    /// Sequences of events that carried no hash.
    pub unverifiable: Vec<u64>,
}

impl IntegrityReport {
    /// Did every event carry a hash?
    pub fn is_complete(&self) -> bool {
        self.unverifiable.is_empty()
    }
}

/// Verify a session, returning the first failure found in sequence order.
pub fn verify_session(session: &ReplaySession) -> Result<IntegrityReport, IntegrityError> {
    let mut report = IntegrityReport::default();
    let mut previous: Option<u64> = None;

    for event in session.sorted_events() {
        if previous == Some(event.sequence) {
            return Err(IntegrityError::DuplicateSequence {
                sequence: event.sequence,
            });
        }
        previous = Some(event.sequence);

        let Some(expected) = event.hash else {
            warn!(
                session = %session.id,
                sequence = event.sequence,
                topic = %event.topic(),
                "Event has no hash, cannot verify"
            );
            report.unverifiable.push(event.sequence);
            continue;
        };

        let computed = compute_event_hash(event.topic(), &event.payload, event.sequence);
        if computed != expected {
            return Err(IntegrityError::HashMismatch {
                sequence: event.sequence,
                expected,
                computed,
            });
        }
        report.verified += 1;
    }

    Ok(report)
}

/// Boolean form of [`verify_session`].
pub fn verify_session_integrity(session: &ReplaySession) -> bool {
    match verify_session(session) {
        Ok(report) => {
            debug!(
                session = %session.id,
                verified = report.verified,
                unverifiable = report.unverifiable.len(),
                "Session integrity verified"
            );
            true
        }
        Err(IntegrityError::HashMismatch { sequence, expected, computed }) => {
            warn!(
                session = %session.id,
                sequence,
                expected = %hash_to_hex(&expected),
                computed = %hash_to_hex(&computed),
                "Session integrity check failed: hash mismatch"
            );
            false
        }
        Err(e) => {
            warn!(session = %session.id, "Session integrity check failed: {}", e);
            false
        }
    }
}
