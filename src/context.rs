//! Event Context
//!
//! Explicitly constructed bundle of the core components sharing one clock
//! and one turbo state. Hosts build one at startup and pass it (or its
//! parts) to whoever publishes or subscribes; tests build a fresh one per
//! case.

use std::sync::Arc;

use tracing::info;

use crate::config::{CoreConfig, TimingConfig};
use crate::core::clock::{Clock, SystemClock, VirtualClock};
use crate::core::turbo::TurboControl;
use crate::error::{ConfigError, Result};
use crate::events::bus::EventBus;
use crate::events::scheduler::EventScheduler;
use crate::events::tracker::EventTracker;
use crate::replay::recorder::ReplayRecorder;
use crate::replay::session::import_session;
use crate::replay::verify::{verify_session, IntegrityReport};

/// All core components, wired together.
#[derive(Debug)]
pub struct EventContext {
    /// Shared turbo state.
    pub turbo: TurboControl,
    /// Named delays.
    pub timings: TimingConfig,
    /// Dispatch statistics.
    pub tracker: EventTracker,
    /// Publish/subscribe bus.
    pub bus: EventBus,
    /// Delayed publishes.
    pub scheduler: EventScheduler,
    /// Session recorder.
    pub recorder: ReplayRecorder,
    virtual_clock: Option<VirtualClock>,
}

impl EventContext {
    /// Build a context on an arbitrary clock.
    pub fn new(config: CoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, clock, None)
    }

    /// Build a context driven by a virtual clock starting at `start_ms`.
    pub fn with_virtual_clock(config: CoreConfig, start_ms: i64) -> Self {
        let clock = VirtualClock::new(start_ms);
        Self::build(config, Arc::new(clock.clone()), Some(clock))
    }

    /// Build a wall-clock context from `REEL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let config = CoreConfig::from_env()?;
        Ok(Self::new(config, Arc::new(SystemClock)))
    }

    fn build(
        config: CoreConfig,
        clock: Arc<dyn Clock>,
        virtual_clock: Option<VirtualClock>,
    ) -> Self {
        let turbo = config.turbo();
        let tracker = EventTracker::new(Arc::clone(&clock));
        let bus = EventBus::with_tracker(Arc::clone(&clock), tracker.clone());
        let scheduler = EventScheduler::new(bus.clone(), Arc::clone(&clock), turbo.clone())
            .with_timings(config.timings.clone());
        let recorder = ReplayRecorder::new(bus.clone(), Arc::clone(&clock));

        info!(
            turbo_multiplier = turbo.multiplier(),
            turbo_active = turbo.is_active(),
            virtual_clock = virtual_clock.is_some(),
            "Event context ready"
        );

        Self {
            turbo,
            timings: config.timings,
            tracker,
            bus,
            scheduler,
            recorder,
            virtual_clock,
        }
    }

    /// Current time on the context clock.
    pub fn now_ms(&self) -> i64 {
        self.bus.clock().now_ms()
    }

    /// Run one host frame at `now`: advance the virtual clock (if any) and
    /// fire due scheduled events. Returns how many fired.
    pub fn tick(&self, now: i64) -> usize {
        if let Some(clock) = &self.virtual_clock {
            clock.set(now);
        }
        self.scheduler.tick(now)
    }

    /// Configured timing scaled by the current turbo state.
    pub fn timing(&self, name: &str) -> Result<i64, ConfigError> {
        self.timings.scaled(name, &self.turbo)
    }

    /// Import exported session text and verify it.
    pub fn audit(&self, text: &str) -> Result<IntegrityReport> {
        let session = import_session(text)?;
        Ok(verify_session(&session)?)
    }
}
