//! Topic Catalog
//!
//! The closed set of gameplay events and their payload shapes. Every
//! publisher and subscriber agrees on this table; adding a topic means
//! adding a [`Topic`] variant, a payload struct and an [`EventPayload`]
//! variant (and, if it should be recorded by default, extending
//! [`Topic::curated`]).
//!
//! Amounts are integer minor units so canonical serialization is exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// TOPIC
// =============================================================================

/// Event category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Player pressed spin
    SpinRequested,
    /// Round accepted and reels about to move
    SpinStarted,
    /// Outcome known (stops and wins)
    SpinResult,
    /// Round fully presented
    SpinCompleted,
    /// One reel started spinning
    ReelSpinStarted,
    /// One reel landed
    ReelSpinStopped,
    /// Bonus feature triggered
    FeatureStarted,
    /// Bonus feature finished
    FeatureEnded,
    /// Wallet balance changed
    BalanceUpdated,
    /// Stake changed
    BetChanged,
    /// Win celebration started
    WinPresentationStarted,
    /// Win celebration finished
    WinPresentationEnded,
    /// Turbo toggled or multiplier changed
    TurboChanged,
    /// Autoplay engaged
    AutoplayStarted,
    /// Autoplay disengaged
    AutoplayStopped,
}

impl Topic {
    /// Every topic in catalog order.
    pub const ALL: [Topic; 15] = [
        Topic::SpinRequested,
        Topic::SpinStarted,
        Topic::SpinResult,
        Topic::SpinCompleted,
        Topic::ReelSpinStarted,
        Topic::ReelSpinStopped,
        Topic::FeatureStarted,
        Topic::FeatureEnded,
        Topic::BalanceUpdated,
        Topic::BetChanged,
        Topic::WinPresentationStarted,
        Topic::WinPresentationEnded,
        Topic::TurboChanged,
        Topic::AutoplayStarted,
        Topic::AutoplayStopped,
    ];

    /// Topics the replay recorder subscribes to unless told otherwise.
    pub const fn curated() -> [Topic; 9] {
        [
            Topic::SpinRequested,
            Topic::SpinStarted,
            Topic::SpinResult,
            Topic::SpinCompleted,
            Topic::ReelSpinStarted,
            Topic::ReelSpinStopped,
            Topic::FeatureStarted,
            Topic::FeatureEnded,
            Topic::BalanceUpdated,
        ]
    }

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::SpinRequested => "spin-requested",
            Topic::SpinStarted => "spin-started",
            Topic::SpinResult => "spin-result",
            Topic::SpinCompleted => "spin-completed",
            Topic::ReelSpinStarted => "reel-spin-started",
            Topic::ReelSpinStopped => "reel-spin-stopped",
            Topic::FeatureStarted => "feature-started",
            Topic::FeatureEnded => "feature-ended",
            Topic::BalanceUpdated => "balance-updated",
            Topic::BetChanged => "bet-changed",
            Topic::WinPresentationStarted => "win-presentation-started",
            Topic::WinPresentationEnded => "win-presentation-ended",
            Topic::TurboChanged => "turbo-changed",
            Topic::AutoplayStarted => "autoplay-started",
            Topic::AutoplayStopped => "autoplay-stopped",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown topic name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Bonus feature kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    /// Free spins round
    FreeSpins,
    /// Pick-style bonus game
    Bonus,
    /// Reels re-spin with held symbols
    Respin,
}

/// Spin button pressed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequested {
    /// Round identifier
    pub round_id: String,
    /// Stake in minor units
    pub bet: i64,
}

/// Round accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinStarted {
    /// Round identifier
    pub round_id: String,
    /// Stake in minor units
    pub bet: i64,
}

/// Single paying line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineWin {
    /// Payline index
    pub line: u32,
    /// Paying symbol
    pub symbol: String,
    /// Symbols in a row
    pub count: u8,
    /// Payout in minor units
    pub payout: i64,
}

/// Round outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    /// Round identifier
    pub round_id: String,
    /// Stop position per reel
    pub stops: Vec<u32>,
    /// Total win in minor units
    pub total_win: i64,
    /// Paying lines
    pub line_wins: Vec<LineWin>,
}

/// Round fully presented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinCompleted {
    /// Round identifier
    pub round_id: String,
    /// Total win in minor units
    pub total_win: i64,
    /// Balance after settlement
    pub balance: i64,
}

/// Reel started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelSpinStarted {
    /// Round identifier
    pub round_id: String,
    /// Reel column (0-based)
    pub reel_index: u8,
}

/// Reel landed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelSpinStopped {
    /// Round identifier
    pub round_id: String,
    /// Reel column (0-based)
    pub reel_index: u8,
    /// Strip position the reel stopped on
    pub stop_position: u32,
    /// Visible symbols top to bottom
    pub symbols: Vec<String>,
}

/// Feature triggered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStarted {
    /// Triggering round
    pub round_id: String,
    /// Which feature
    pub feature: FeatureKind,
    /// Spins awarded (0 for non-spin features)
    pub awarded_spins: u32,
}

/// Feature finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEnded {
    /// Triggering round
    pub round_id: String,
    /// Which feature
    pub feature: FeatureKind,
    /// Feature total win in minor units
    pub total_win: i64,
}

/// Balance changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdated {
    /// New balance in minor units
    pub balance: i64,
    /// Signed change
    pub delta: i64,
}

/// Stake changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetChanged {
    /// New stake in minor units
    pub bet: i64,
}

/// Win celebration started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinPresentationStarted {
    /// Round identifier
    pub round_id: String,
    /// Amount presented
    pub amount: i64,
}

/// Win celebration finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinPresentationEnded {
    /// Round identifier
    pub round_id: String,
}

/// Turbo state changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurboChanged {
    /// Turbo on?
    pub active: bool,
    /// Speed multiplier
    pub multiplier: u32,
}

/// Autoplay engaged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoplayStarted {
    /// Spins requested
    pub spins: u32,
}

/// Autoplay disengaged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoplayStopped {
    /// Spins left unplayed
    pub remaining: u32,
}

// =============================================================================
// TAGGED UNION
// =============================================================================

/// Payload of any catalog event, tagged with its topic.
///
/// Serializes adjacently tagged as `{"type": "<topic>", "payload": {..}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum EventPayload {
    /// See [`SpinRequested`]
    SpinRequested(SpinRequested),
    /// See [`SpinStarted`]
    SpinStarted(SpinStarted),
    /// See [`SpinResult`]
    SpinResult(SpinResult),
    /// See [`SpinCompleted`]
    SpinCompleted(SpinCompleted),
    /// See [`ReelSpinStarted`]
    ReelSpinStarted(ReelSpinStarted),
    /// See [`ReelSpinStopped`]
    ReelSpinStopped(ReelSpinStopped),
    /// See [`FeatureStarted`]
    FeatureStarted(FeatureStarted),
    /// See [`FeatureEnded`]
    FeatureEnded(FeatureEnded),
    /// See [`BalanceUpdated`]
    BalanceUpdated(BalanceUpdated),
    /// See [`BetChanged`]
    BetChanged(BetChanged),
    /// See [`WinPresentationStarted`]
    WinPresentationStarted(WinPresentationStarted),
    /// See [`WinPresentationEnded`]
    WinPresentationEnded(WinPresentationEnded),
    /// See [`TurboChanged`]
    TurboChanged(TurboChanged),
    /// See [`AutoplayStarted`]
    AutoplayStarted(AutoplayStarted),
    /// See [`AutoplayStopped`]
    AutoplayStopped(AutoplayStopped),
}

impl EventPayload {
    /// Round this event belongs to, if it carries one.
    pub fn round_id(&self) -> Option<&str> {
        match self {
            EventPayload::SpinRequested(p) => Some(&p.round_id),
            EventPayload::SpinStarted(p) => Some(&p.round_id),
            EventPayload::SpinResult(p) => Some(&p.round_id),
            EventPayload::SpinCompleted(p) => Some(&p.round_id),
            EventPayload::ReelSpinStarted(p) => Some(&p.round_id),
            EventPayload::ReelSpinStopped(p) => Some(&p.round_id),
            EventPayload::FeatureStarted(p) => Some(&p.round_id),
            EventPayload::FeatureEnded(p) => Some(&p.round_id),
            EventPayload::WinPresentationStarted(p) => Some(&p.round_id),
            EventPayload::WinPresentationEnded(p) => Some(&p.round_id),
            EventPayload::BalanceUpdated(_)
            | EventPayload::BetChanged(_)
            | EventPayload::TurboChanged(_)
            | EventPayload::AutoplayStarted(_)
            | EventPayload::AutoplayStopped(_) => None,
        }
    }
}

/// A payload struct bound to exactly one topic.
///
/// Lets subscribers register handlers that receive the concrete payload
/// type instead of matching on [`EventPayload`].
pub trait TopicEvent: Clone + Into<EventPayload> + Send + Sync + 'static {
    /// Topic this payload is published under.
    const TOPIC: Topic;

    /// Borrow the concrete payload out of the union.
    fn from_payload(payload: &EventPayload) -> Option<&Self>;
}

macro_rules! bind_topics {
    ($($name:ident),* $(,)?) => {
        $(
            impl TopicEvent for $name {
                const TOPIC: Topic = Topic::$name;

                fn from_payload(payload: &EventPayload) -> Option<&Self> {
                    match payload {
                        EventPayload::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$name> for EventPayload {
                fn from(value: $name) -> Self {
                    EventPayload::$name(value)
                }
            }
        )*

        impl EventPayload {
            /// Topic this payload belongs to.
            pub fn topic(&self) -> Topic {
                match self {
                    $(EventPayload::$name(_) => Topic::$name,)*
                }
            }
        }
    };
}

bind_topics!(
    SpinRequested,
    SpinStarted,
    SpinResult,
    SpinCompleted,
    ReelSpinStarted,
    ReelSpinStopped,
    FeatureStarted,
    FeatureEnded,
    BalanceUpdated,
    BetChanged,
    WinPresentationStarted,
    WinPresentationEnded,
    TurboChanged,
    AutoplayStarted,
    AutoplayStopped,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{}\"", topic.as_str()));
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert!("spin-exploded".parse::<Topic>().is_err());
    }

    #[test]
    fn test_curated_set() {
        let names: Vec<&str> = Topic::curated().iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            [
                "spin-requested",
                "spin-started",
                "spin-result",
                "spin-completed",
                "reel-spin-started",
                "reel-spin-stopped",
                "feature-started",
                "feature-ended",
                "balance-updated",
            ]
        );
    }

    #[test]
    fn test_payload_tagging() {
        let payload: EventPayload = BetChanged { bet: 200 }.into();
        assert_eq!(payload.topic(), Topic::BetChanged);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "bet-changed");
        assert_eq!(json["payload"]["bet"], 200);

        let back: EventPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_typed_extraction() {
        let payload: EventPayload = ReelSpinStopped {
            round_id: "r1".into(),
            reel_index: 2,
            stop_position: 17,
            symbols: vec!["A".into(), "K".into(), "Q".into()],
        }
        .into();

        assert_eq!(ReelSpinStopped::TOPIC, Topic::ReelSpinStopped);
        assert_eq!(ReelSpinStopped::from_payload(&payload).unwrap().stop_position, 17);
        assert!(ReelSpinStarted::from_payload(&payload).is_none());
        assert_eq!(payload.round_id(), Some("r1"));
    }

    #[test]
    fn test_round_id_absent_for_wallet_events() {
        let payload: EventPayload = BalanceUpdated { balance: 5, delta: 1 }.into();
        assert_eq!(payload.round_id(), None);
    }

    #[test]
    fn test_camel_case_fields() {
        let payload: EventPayload = FeatureStarted {
            round_id: "r9".into(),
            feature: FeatureKind::FreeSpins,
            awarded_spins: 10,
        }
        .into();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["payload"]["roundId"], "r9");
        assert_eq!(json["payload"]["feature"], "free-spins");
        assert_eq!(json["payload"]["awardedSpins"], 10);
    }
}
