//! Replay Recorder
//!
//! Captures gameplay into a [`ReplaySession`].
//!
//! States: Idle -> Recording -> Idle. Starting while already recording
//! stops the current session first and drops it. The topic set is read
//! when recording starts, so edits apply to the next session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::core::clock::Clock;
use crate::events::bus::{EventBus, SubscriptionId};
use crate::events::topic::Topic;
use crate::replay::session::{ReplaySession, SessionId, SessionMetadata};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Curated bus subscriber that records sessions.
pub struct ReplayRecorder {
    bus: EventBus,
    clock: Arc<dyn Clock>,
    event_types: Mutex<Vec<Topic>>,
    active: Arc<Mutex<Option<ReplaySession>>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl ReplayRecorder {
    /// Create an idle recorder with the curated topic set.
    pub fn new(bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            bus,
            clock,
            event_types: Mutex::new(Topic::curated().to_vec()),
            active: Arc::new(Mutex::new(None)),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Start a new session without a seed.
    pub fn start_recording(
        &self,
        game_id: impl Into<String>,
        initial_balance: i64,
        bet: i64,
    ) -> SessionId {
        self.start_recording_with_seed(game_id, initial_balance, bet, None)
    }

    /// Start a new session.
    ///
    /// An active session is stopped and discarded first.
    pub fn start_recording_with_seed(
        &self,
        game_id: impl Into<String>,
        initial_balance: i64,
        bet: i64,
        seed: Option<String>,
    ) -> SessionId {
        if let Some(dropped) = self.stop_recording() {
            debug!(
                session = %dropped.id,
                events = dropped.events.len(),
                "Discarded session on restart"
            );
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = ReplaySession::new(
            id.clone(),
            game_id,
            self.clock.now_ms(),
            SessionMetadata {
                initial_balance,
                bet,
                seed,
            },
        );
        let game_id = session.game_id.clone();
        *lock(&self.active) = Some(session);

        let topics = lock(&self.event_types).clone();
        let mut subscriptions = lock(&self.subscriptions);
        for topic in &topics {
            let active = Arc::clone(&self.active);
            let subscription = self.bus.subscribe(*topic, move |envelope| {
                if let Some(session) = lock(&active).as_mut() {
                    session.record(envelope);
                }
                Ok(())
            });
            subscriptions.push(subscription);
        }

        info!(session = %id, game = %game_id, topics = topics.len(), "Recording started");
        id
    }

    /// Stop recording and return the finished session (`None` if idle).
    pub fn stop_recording(&self) -> Option<ReplaySession> {
        for subscription in lock(&self.subscriptions).drain(..) {
            self.bus.unsubscribe(subscription);
        }

        let mut session = lock(&self.active).take()?;
        session.end_time = Some(self.clock.now_ms());
        info!(
            session = %session.id,
            events = session.events.len(),
            duration_ms = session.duration_ms().unwrap_or(0),
            "Recording stopped"
        );
        Some(session)
    }

    /// Is a session being recorded?
    pub fn is_recording(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Snapshot of the session being recorded.
    pub fn current_session(&self) -> Option<ReplaySession> {
        lock(&self.active).clone()
    }

    /// Topics the next session will record.
    pub fn event_types(&self) -> Vec<Topic> {
        lock(&self.event_types).clone()
    }

    /// Record `topic` from the next session on.
    pub fn add_event_type(&self, topic: Topic) {
        let mut types = lock(&self.event_types);
        if !types.contains(&topic) {
            types.push(topic);
        }
    }

    /// Stop recording `topic` from the next session on.
    pub fn remove_event_type(&self, topic: Topic) {
        lock(&self.event_types).retain(|t| *t != topic);
    }
}

impl std::fmt::Debug for ReplayRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayRecorder")
            .field("recording", &self.is_recording())
            .field("event_types", &self.event_types())
            .finish()
    }
}
