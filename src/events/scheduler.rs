//! Event Scheduler
//!
//! Queues payloads for delayed or repeated publication through the bus.
//! The host calls [`EventScheduler::tick`] once per frame; nothing fires
//! between ticks, so firing time has tick granularity. Consumers that need
//! exact ordering use the bus sequence number, not scheduled times.
//!
//! Delays and intervals are divided by the turbo divisor at the moment they
//! are read. Toggling turbo never moves an already computed `execute_at`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::TimingConfig;
use crate::core::clock::Clock;
use crate::core::turbo::TurboControl;
use crate::error::ConfigError;
use crate::events::bus::EventBus;
use crate::events::topic::{EventPayload, Topic};

/// Scheduled entry identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleId(u64);

/// How many times a repeating entry fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatCount {
    /// Fire this many more times.
    Times(u64),
    /// Fire until cancelled.
    Forever,
}

impl RepeatCount {
    fn has_more(self) -> bool {
        match self {
            RepeatCount::Times(n) => n > 1,
            RepeatCount::Forever => true,
        }
    }

    fn decrement(&mut self) {
        if let RepeatCount::Times(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Repeat {
    /// Unscaled interval; turbo is applied at each reschedule.
    interval_ms: i64,
    remaining: RepeatCount,
}

#[derive(Clone, Debug)]
struct ScheduledEvent {
    payload: EventPayload,
    execute_at: i64,
    repeat: Option<Repeat>,
}

#[derive(Default)]
struct SchedulerState {
    next_id: u64,
    queue: BTreeMap<ScheduleId, ScheduledEvent>,
}

impl SchedulerState {
    fn allocate(&mut self) -> ScheduleId {
        self.next_id += 1;
        ScheduleId(self.next_id)
    }
}

/// Shared scheduler handle.
#[derive(Clone)]
pub struct EventScheduler {
    bus: EventBus,
    clock: Arc<dyn Clock>,
    turbo: TurboControl,
    timings: Arc<TimingConfig>,
    state: Arc<Mutex<SchedulerState>>,
}

impl EventScheduler {
    /// Create a scheduler publishing through `bus`.
    pub fn new(bus: EventBus, clock: Arc<dyn Clock>, turbo: TurboControl) -> Self {
        Self {
            bus,
            clock,
            turbo,
            timings: Arc::new(TimingConfig::empty()),
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Use `timings` for [`EventScheduler::schedule_timing`].
    pub fn with_timings(mut self, timings: TimingConfig) -> Self {
        self.timings = Arc::new(timings);
        self
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `payload` once, `delay_ms` from now. Negative delays fire on
    /// the next tick.
    pub fn schedule(&self, payload: impl Into<EventPayload>, delay_ms: i64) -> ScheduleId {
        let payload = payload.into();
        let execute_at = self
            .clock
            .now_ms()
            .saturating_add(self.turbo.scale(delay_ms.max(0)));
        let topic = payload.topic();

        let mut state = self.state();
        let id = state.allocate();
        state.queue.insert(
            id,
            ScheduledEvent {
                payload,
                execute_at,
                repeat: None,
            },
        );
        debug!(%topic, schedule = id.0, execute_at, "Scheduled");
        id
    }

    /// Publish `payload` once after the configured timing `name`.
    pub fn schedule_timing(
        &self,
        payload: impl Into<EventPayload>,
        name: &str,
    ) -> Result<ScheduleId, ConfigError> {
        // Scaling happens in `schedule`.
        let delay = self.timings.get(name)?;
        Ok(self.schedule(payload, delay))
    }

    /// Publish `payload` every `interval_ms`, starting one interval from now.
    ///
    /// `RepeatCount::Times(0)` never fires; the returned id is not queued.
    pub fn schedule_repeat(
        &self,
        payload: impl Into<EventPayload>,
        interval_ms: i64,
        count: RepeatCount,
    ) -> ScheduleId {
        let payload = payload.into();
        let topic = payload.topic();
        let interval_ms = interval_ms.max(0);

        let mut state = self.state();
        let id = state.allocate();
        if count == RepeatCount::Times(0) {
            debug!(%topic, schedule = id.0, "Repeat count is zero, not queued");
            return id;
        }

        let execute_at = self
            .clock
            .now_ms()
            .saturating_add(self.turbo.scale(interval_ms));
        state.queue.insert(
            id,
            ScheduledEvent {
                payload,
                execute_at,
                repeat: Some(Repeat {
                    interval_ms,
                    remaining: count,
                }),
            },
        );
        debug!(%topic, schedule = id.0, execute_at, interval_ms, ?count, "Scheduled repeat");
        id
    }

    /// Remove an entry. Returns whether it was queued.
    pub fn cancel(&self, id: ScheduleId) -> bool {
        let removed = self.state().queue.remove(&id).is_some();
        if removed {
            debug!(schedule = id.0, "Cancelled");
        }
        removed
    }

    /// Drop every queued entry.
    pub fn cancel_all(&self) {
        let mut state = self.state();
        let dropped = state.queue.len();
        state.queue.clear();
        debug!(dropped, "Cancelled all scheduled events");
    }

    /// Publish every entry due at `now`. Returns how many fired.
    ///
    /// Due entries fire in id order. Each fires at most once per tick;
    /// entries added by handlers during the tick wait for the next one, and
    /// entries cancelled by handlers during the tick do not fire.
    pub fn tick(&self, now: i64) -> usize {
        let due: Vec<ScheduleId> = self
            .state()
            .queue
            .iter()
            .filter(|(_, entry)| entry.execute_at <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut fired = 0;
        for id in due {
            let payload = {
                let mut state = self.state();
                let Some(entry) = state.queue.get_mut(&id) else {
                    continue;
                };
                let payload = entry.payload.clone();
                let keep = match &mut entry.repeat {
                    Some(repeat) if repeat.remaining.has_more() => {
                        repeat.remaining.decrement();
                        let interval = self.turbo.scale(repeat.interval_ms);
                        entry.execute_at = now.saturating_add(interval);
                        true
                    }
                    _ => false,
                };
                if !keep {
                    state.queue.remove(&id);
                }
                payload
            };

            // Lock released: handlers may schedule or cancel.
            self.bus.publish(payload);
            fired += 1;
        }
        fired
    }

    /// Queued entries.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Is `id` still queued?
    pub fn is_scheduled(&self, id: ScheduleId) -> bool {
        self.state().queue.contains_key(&id)
    }

    /// Earliest `execute_at` in the queue.
    pub fn next_due(&self) -> Option<i64> {
        self.state().queue.values().map(|e| e.execute_at).min()
    }

    /// Queued entries for `topic`.
    pub fn pending_for(&self, topic: Topic) -> usize {
        self.state()
            .queue
            .values()
            .filter(|e| e.payload.topic() == topic)
            .count()
    }
}

impl std::fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::VirtualClock;
    use crate::events::topic::{BetChanged, ReelSpinStopped, WinPresentationEnded};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        bus: EventBus,
        clock: VirtualClock,
        turbo: TurboControl,
        scheduler: EventScheduler,
    }

    fn harness() -> Harness {
        let clock = VirtualClock::new(0);
        let bus = EventBus::new(Arc::new(clock.clone()));
        let turbo = TurboControl::new(2, false);
        let scheduler = EventScheduler::new(bus.clone(), Arc::new(clock.clone()), turbo.clone())
            .with_timings(TimingConfig::default());
        Harness {
            bus,
            clock,
            turbo,
            scheduler,
        }
    }

    fn counter(bus: &EventBus, topic: Topic) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(topic, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        count
    }

    fn stop(reel: u8) -> ReelSpinStopped {
        ReelSpinStopped {
            round_id: "r1".into(),
            reel_index: reel,
            stop_position: 0,
            symbols: vec![],
        }
    }

    #[test]
    fn test_one_shot_fires_once() {
        let h = harness();
        let fired = counter(&h.bus, Topic::BetChanged);

        h.scheduler.schedule(BetChanged { bet: 10 }, 100);

        assert_eq!(h.scheduler.tick(50), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        assert_eq!(h.scheduler.tick(150), 1);
        assert_eq!(h.scheduler.tick(300), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn test_repeat_fires_count_times_then_removed() {
        let h = harness();
        let fired = counter(&h.bus, Topic::ReelSpinStopped);

        let id = h.scheduler.schedule_repeat(stop(0), 50, RepeatCount::Times(3));
        for t in [50, 100, 150, 200] {
            h.scheduler.tick(t);
        }

        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(!h.scheduler.is_scheduled(id));
    }

    #[test]
    fn test_repeat_zero_never_fires() {
        let h = harness();
        let fired = counter(&h.bus, Topic::ReelSpinStopped);

        let id = h.scheduler.schedule_repeat(stop(0), 10, RepeatCount::Times(0));
        h.scheduler.tick(1_000);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!h.scheduler.cancel(id));
    }

    #[test]
    fn test_repeat_forever_until_cancelled() {
        let h = harness();
        let fired = counter(&h.bus, Topic::ReelSpinStopped);

        let id = h.scheduler.schedule_repeat(stop(1), 10, RepeatCount::Forever);
        for t in (10..=100).step_by(10) {
            h.scheduler.tick(t);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 10);

        assert!(h.scheduler.cancel(id));
        h.scheduler.tick(200);
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_negative_delay_fires_next_tick() {
        let h = harness();
        h.clock.set(500);
        h.scheduler.schedule(BetChanged { bet: 1 }, -250);
        assert_eq!(h.scheduler.next_due(), Some(500));
        assert_eq!(h.scheduler.tick(500), 1);
    }

    #[test]
    fn test_cancel_and_cancel_all() {
        let h = harness();
        let a = h.scheduler.schedule(BetChanged { bet: 1 }, 10);
        h.scheduler.schedule(BetChanged { bet: 2 }, 20);
        h.scheduler.schedule_repeat(stop(0), 5, RepeatCount::Forever);

        assert!(h.scheduler.cancel(a));
        assert!(!h.scheduler.cancel(a));
        assert_eq!(h.scheduler.pending(), 2);

        h.scheduler.cancel_all();
        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(h.scheduler.tick(1_000), 0);
    }

    #[test]
    fn test_turbo_scales_new_delays_only() {
        let h = harness();
        h.turbo.set_active(true);
        let fast = h.scheduler.schedule(BetChanged { bet: 1 }, 1000);
        assert_eq!(h.scheduler.next_due(), Some(500));

        h.turbo.set_active(false);
        h.scheduler.cancel(fast);
        h.scheduler.schedule(BetChanged { bet: 2 }, 1000);
        assert_eq!(h.scheduler.next_due(), Some(1000));
    }

    #[test]
    fn test_turbo_toggle_does_not_move_in_flight_entry() {
        let h = harness();
        h.turbo.set_active(true);
        h.scheduler.schedule(BetChanged { bet: 1 }, 1000);
        h.turbo.set_active(false);

        assert_eq!(h.scheduler.tick(499), 0);
        assert_eq!(h.scheduler.tick(500), 1);
    }

    #[test]
    fn test_repeat_interval_rescaled_at_each_reschedule() {
        let h = harness();
        let id = h.scheduler.schedule_repeat(stop(0), 100, RepeatCount::Forever);
        assert_eq!(h.scheduler.next_due(), Some(100));

        h.turbo.set_active(true);
        h.scheduler.tick(100);
        assert_eq!(h.scheduler.next_due(), Some(150));
        h.scheduler.cancel(id);
    }

    #[test]
    fn test_huge_delays_saturate_instead_of_wrapping() {
        let h = harness();
        h.clock.set(1_000);
        let fired = counter(&h.bus, Topic::BetChanged);

        h.scheduler.schedule(BetChanged { bet: 1 }, i64::MAX);
        assert_eq!(h.scheduler.next_due(), Some(i64::MAX));
        assert_eq!(h.scheduler.tick(2_000), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        h.scheduler.cancel_all();
        let id = h.scheduler.schedule_repeat(stop(0), i64::MAX, RepeatCount::Forever);
        assert_eq!(h.scheduler.tick(i64::MAX), 1);
        assert!(h.scheduler.is_scheduled(id));
        assert_eq!(h.scheduler.next_due(), Some(i64::MAX));
    }

    #[test]
    fn test_schedule_timing() {
        let h = harness();
        h.scheduler
            .schedule_timing(WinPresentationEnded { round_id: "r1".into() }, "win-presentation")
            .unwrap();
        assert_eq!(h.scheduler.next_due(), Some(2000));

        let err = h
            .scheduler
            .schedule_timing(BetChanged { bet: 1 }, "never-configured")
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownTiming("never-configured".into()));
        assert_eq!(h.scheduler.pending(), 1);
    }

    #[test]
    fn test_handler_cancel_during_tick() {
        let h = harness();
        let fired = counter(&h.bus, Topic::ReelSpinStopped);
        let victim: Arc<Mutex<Option<ScheduleId>>> = Arc::new(Mutex::new(None));
        {
            let scheduler = h.scheduler.clone();
            let victim = Arc::clone(&victim);
            h.bus.subscribe(Topic::BetChanged, move |_| {
                if let Some(id) = *victim.lock().unwrap() {
                    scheduler.cancel(id);
                }
                Ok(())
            });
        }

        // Both due at t=10; the bet change fires first and cancels the stop.
        h.scheduler.schedule(BetChanged { bet: 1 }, 10);
        *victim.lock().unwrap() = Some(h.scheduler.schedule(stop(1), 10));

        assert_eq!(h.scheduler.tick(10), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn test_handler_scheduling_during_tick_waits_for_next_tick() {
        let h = harness();
        let fired = counter(&h.bus, Topic::ReelSpinStopped);
        {
            let scheduler = h.scheduler.clone();
            h.bus.subscribe(Topic::BetChanged, move |_| {
                scheduler.schedule(stop(0), 0);
                Ok(())
            });
        }

        h.scheduler.schedule(BetChanged { bet: 1 }, 0);
        assert_eq!(h.scheduler.tick(0), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(h.scheduler.tick(0), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_simultaneous_entries_fire_in_id_order() {
        let h = harness();
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let order = Arc::clone(&order);
            h.bus.subscribe(Topic::ReelSpinStopped, move |envelope| {
                let stop = envelope.payload_as::<ReelSpinStopped>().unwrap();
                order.lock().unwrap().push(stop.reel_index);
                Ok(())
            });
        }

        for reel in 0..5 {
            h.scheduler.schedule(stop(reel), 100 - i64::from(reel) * 10);
        }
        h.scheduler.tick(100);

        assert_eq!(*order.lock().unwrap(), [0, 1, 2, 3, 4]);
        assert_eq!(h.scheduler.pending_for(Topic::ReelSpinStopped), 0);
    }
}
