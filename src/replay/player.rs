//! Session Playback
//!
//! Re-publishes a recorded session through a live bus. Playback follows
//! the recorded sequence order; relative timestamps only set pacing. The
//! live bus stamps fresh sequence numbers and hashes, so the original
//! session stays the audit record.

use tracing::info;

use crate::events::bus::EventBus;
use crate::events::scheduler::{EventScheduler, ScheduleId};
use crate::replay::session::ReplaySession;

/// Timed playback of one session through a scheduler.
#[derive(Debug)]
pub struct ReplayPlayer {
    scheduler: EventScheduler,
    scheduled: Vec<ScheduleId>,
}

impl ReplayPlayer {
    /// Create an idle player.
    pub fn new(scheduler: EventScheduler) -> Self {
        Self {
            scheduler,
            scheduled: Vec::new(),
        }
    }

    /// Queue every event of `session`, replacing any playback in progress.
    ///
    /// Delays are clamped to be non-decreasing in sequence order so that
    /// the scheduler's id order reproduces the recorded order even when
    /// timestamps tie or skew. Turbo applies as for any scheduled event.
    pub fn play(&mut self, session: &ReplaySession) -> usize {
        self.stop();

        let mut delay = 0;
        for event in session.sorted_events() {
            delay = delay.max(event.timestamp_relative_ms);
            let id = self.scheduler.schedule(event.payload.clone(), delay);
            self.scheduled.push(id);
        }

        info!(session = %session.id, events = self.scheduled.len(), "Playback queued");
        self.scheduled.len()
    }

    /// Cancel whatever has not fired yet.
    pub fn stop(&mut self) {
        for id in self.scheduled.drain(..) {
            self.scheduler.cancel(id);
        }
    }

    /// Events still waiting to fire.
    pub fn remaining(&self) -> usize {
        self.scheduled
            .iter()
            .filter(|id| self.scheduler.is_scheduled(**id))
            .count()
    }

    /// Has every queued event fired?
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
}

/// Publish every event of `session` immediately, in sequence order.
pub fn replay_into(session: &ReplaySession, bus: &EventBus) -> usize {
    let events = session.sorted_events();
    for event in &events {
        bus.publish(event.payload.clone());
    }
    events.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::VirtualClock;
    use crate::core::turbo::TurboControl;
    use crate::events::envelope::EventEnvelope;
    use crate::events::topic::{BetChanged, EventPayload, Topic};
    use crate::replay::session::SessionMetadata;
    use std::sync::{Arc, Mutex};

    fn session_with_bets(timestamps: &[i64]) -> ReplaySession {
        let mut session = ReplaySession::new(
            "s",
            "g",
            0,
            SessionMetadata {
                initial_balance: 0,
                bet: 1,
                seed: None,
            },
        );
        for (i, ts) in timestamps.iter().enumerate() {
            let payload: EventPayload = BetChanged { bet: i as i64 }.into();
            session.record(&EventEnvelope::stamp(payload, i as u64 + 1, *ts));
        }
        session
    }

    fn recorded_bets(bus: &EventBus) -> Arc<Mutex<Vec<i64>>> {
        let bets = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&bets);
        bus.on::<BetChanged, _>(move |payload, _| {
            sink.lock().unwrap().push(payload.bet);
            Ok(())
        });
        bets
    }

    #[test]
    fn test_playback_follows_sequence_and_pacing() {
        let clock = VirtualClock::new(0);
        let bus = EventBus::new(Arc::new(clock.clone()));
        let scheduler =
            EventScheduler::new(bus.clone(), Arc::new(clock.clone()), TurboControl::default());
        let bets = recorded_bets(&bus);

        // Third event carries a skewed (earlier) timestamp.
        let mut session = session_with_bets(&[0, 100, 50, 200]);
        session.events.reverse();

        let mut player = ReplayPlayer::new(scheduler.clone());
        assert_eq!(player.play(&session), 4);

        scheduler.tick(0);
        assert_eq!(*bets.lock().unwrap(), [0]);
        scheduler.tick(100);
        assert_eq!(*bets.lock().unwrap(), [0, 1, 2]);
        assert_eq!(player.remaining(), 1);
        scheduler.tick(200);
        assert_eq!(*bets.lock().unwrap(), [0, 1, 2, 3]);
        assert!(player.is_finished());
    }

    #[test]
    fn test_playback_honours_turbo() {
        let clock = VirtualClock::new(0);
        let bus = EventBus::new(Arc::new(clock.clone()));
        let turbo = TurboControl::new(4, true);
        let scheduler = EventScheduler::new(bus.clone(), Arc::new(clock.clone()), turbo);

        let mut player = ReplayPlayer::new(scheduler.clone());
        player.play(&session_with_bets(&[0, 400]));

        scheduler.tick(100);
        assert!(player.is_finished());
    }

    #[test]
    fn test_stop_cancels_pending() {
        let clock = VirtualClock::new(0);
        let bus = EventBus::new(Arc::new(clock.clone()));
        let scheduler = EventScheduler::new(bus.clone(), Arc::new(clock), TurboControl::default());

        let mut player = ReplayPlayer::new(scheduler.clone());
        player.play(&session_with_bets(&[10, 20, 30]));
        player.stop();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.tick(100), 0);
    }

    #[test]
    fn test_replay_into_publishes_in_order() {
        let clock = VirtualClock::new(0);
        let bus = EventBus::new(Arc::new(clock));
        let bets = recorded_bets(&bus);

        let mut session = session_with_bets(&[5, 5, 5]);
        session.events.swap(0, 2);

        assert_eq!(replay_into(&session, &bus), 3);
        assert_eq!(*bets.lock().unwrap(), [0, 1, 2]);
        assert_eq!(bus.last_sequence(), 3);
        assert_eq!(bus.subscriber_count(Topic::BetChanged), 1);
    }
}
