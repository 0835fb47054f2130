//! Error Types
//!
//! Handler failures never surface here: the bus isolates and logs them.
//! Configuration, parse and integrity failures are always returned to the
//! caller.

use thiserror::Error;

use crate::core::hash::EventHash;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A timing was requested that was never configured.
    #[error("timing not configured: {0}")]
    UnknownTiming(String),

    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
}

/// Session import errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Text is not a session document.
    #[error("malformed session: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Document parsed but describes an impossible session.
    #[error("invalid session: {0}")]
    Invalid(String),
}

/// Integrity check failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    /// Recomputed hash differs from the stored one.
    #[error("hash mismatch at sequence {sequence}")]
    HashMismatch {
        /// Sequence of the offending event.
        sequence: u64,
        /// Hash stored in the session.
        expected: EventHash,
        /// Hash recomputed from topic, payload and sequence.
        computed: EventHash,
    },

    /// Two events claim the same sequence number.
    #[error("duplicate sequence {sequence}")]
    DuplicateSequence {
        /// Repeated sequence number.
        sequence: u64,
    },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session import error.
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),

    /// Integrity failure.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
}

/// Crate result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
