//! Event Tracker
//!
//! Passive per-topic statistics fed by bus dispatches. Never influences
//! delivery.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::core::clock::Clock;
use crate::events::topic::Topic;

/// Statistics for one topic.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    /// Topic observed
    pub topic: Topic,
    /// Dispatches seen
    pub count: u64,
    /// Time of the latest dispatch (ms)
    pub last_emitted: i64,
    /// Running mean of total handler time per dispatch (ms)
    pub average_handler_time_ms: f64,
}

/// Shared tracker handle.
#[derive(Clone)]
pub struct EventTracker {
    clock: Arc<dyn Clock>,
    stats: Arc<Mutex<BTreeMap<Topic, EventStats>>>,
}

impl EventTracker {
    /// Create an empty tracker.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            stats: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    fn stats(&self) -> MutexGuard<'_, BTreeMap<Topic, EventStats>> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one dispatch of `topic`.
    pub fn track(&self, topic: Topic, handler_time_ms: f64) {
        let now = self.clock.now_ms();
        let mut stats = self.stats();
        let entry = stats.entry(topic).or_insert(EventStats {
            topic,
            count: 0,
            last_emitted: now,
            average_handler_time_ms: 0.0,
        });

        entry.count += 1;
        entry.last_emitted = now;
        let n = entry.count as f64;
        entry.average_handler_time_ms =
            (entry.average_handler_time_ms * (n - 1.0) + handler_time_ms) / n;
    }

    /// Stats for one topic, if it was ever seen.
    pub fn get_stats(&self, topic: Topic) -> Option<EventStats> {
        self.stats().get(&topic).cloned()
    }

    /// Stats for every seen topic, in catalog order.
    pub fn get_all_stats(&self) -> Vec<EventStats> {
        self.stats().values().cloned().collect()
    }

    /// Busiest topics first.
    pub fn get_top_by_count(&self, limit: usize) -> Vec<EventStats> {
        let mut all = self.get_all_stats();
        all.sort_by(|a, b| b.count.cmp(&a.count));
        all.truncate(limit);
        all
    }

    /// Slowest topics first, by average handler time.
    pub fn slowest(&self, limit: usize) -> Vec<EventStats> {
        let mut all = self.get_all_stats();
        all.sort_by(|a, b| b.average_handler_time_ms.total_cmp(&a.average_handler_time_ms));
        all.truncate(limit);
        all
    }

    /// Dispatches seen across all topics.
    pub fn get_total_count(&self) -> u64 {
        self.stats().values().map(|s| s.count).sum()
    }

    /// Forget everything.
    pub fn reset(&self) {
        self.stats().clear();
    }
}

impl std::fmt::Debug for EventTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTracker")
            .field("topics", &self.stats().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::VirtualClock;

    fn tracker() -> (EventTracker, VirtualClock) {
        let clock = VirtualClock::new(0);
        (EventTracker::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_running_average() {
        let (tracker, clock) = tracker();
        tracker.track(Topic::SpinResult, 2.0);
        clock.advance(10);
        tracker.track(Topic::SpinResult, 4.0);
        clock.advance(10);
        tracker.track(Topic::SpinResult, 9.0);

        let stats = tracker.get_stats(Topic::SpinResult).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.last_emitted, 20);
        assert!((stats.average_handler_time_ms - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_unseen_topic_has_no_stats() {
        let (tracker, _) = tracker();
        assert!(tracker.get_stats(Topic::BetChanged).is_none());
        assert!(tracker.get_all_stats().is_empty());
        assert_eq!(tracker.get_total_count(), 0);
    }

    #[test]
    fn test_top_by_count_and_total() {
        let (tracker, _) = tracker();
        for _ in 0..3 {
            tracker.track(Topic::ReelSpinStopped, 0.0);
        }
        tracker.track(Topic::SpinStarted, 0.0);
        for _ in 0..2 {
            tracker.track(Topic::BalanceUpdated, 0.0);
        }

        let top = tracker.get_top_by_count(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].topic, Topic::ReelSpinStopped);
        assert_eq!(top[1].topic, Topic::BalanceUpdated);
        assert_eq!(tracker.get_total_count(), 6);
    }

    #[test]
    fn test_slowest() {
        let (tracker, _) = tracker();
        tracker.track(Topic::SpinStarted, 1.0);
        tracker.track(Topic::SpinResult, 8.0);
        tracker.track(Topic::SpinCompleted, 3.0);

        let slow = tracker.slowest(1);
        assert_eq!(slow[0].topic, Topic::SpinResult);
    }

    #[test]
    fn test_reset() {
        let (tracker, _) = tracker();
        tracker.track(Topic::SpinStarted, 1.0);
        tracker.reset();
        assert_eq!(tracker.get_total_count(), 0);
    }
}
