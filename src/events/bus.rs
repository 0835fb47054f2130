//! Event Bus
//!
//! Central synchronous dispatcher. Every publish:
//! 1. takes the next global sequence number (starting at 1),
//! 2. stamps an [`EventEnvelope`] with that number, the clock time and the
//!    integrity hash,
//! 3. invokes each live handler for the topic in registration order.
//!
//! Handlers run outside the registry lock, so they may publish, subscribe
//! or unsubscribe. A nested publish takes the next sequence number
//! immediately, keeping the global order strictly increasing.
//!
//! A handler that returns `Err` or panics is logged and counted in the
//! [`DispatchReport`]; delivery to the remaining handlers continues and
//! nothing propagates to the publisher.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, error};

use crate::core::clock::Clock;
use crate::events::envelope::EventEnvelope;
use crate::events::topic::{EventPayload, Topic, TopicEvent};
use crate::events::tracker::EventTracker;

/// Subscriber callback.
pub type Handler = Arc<dyn Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync>;

/// Opaque subscription token. Never reused within one bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    handler: Handler,
    active: AtomicBool,
}

/// Outcome of one publish.
#[derive(Clone, Debug)]
pub struct DispatchReport {
    /// The stamped envelope that was delivered.
    pub envelope: EventEnvelope,
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Sequence number assigned to this publish.
    pub fn sequence(&self) -> u64 {
        self.envelope.sequence()
    }
}

struct BusInner {
    clock: Arc<dyn Clock>,
    /// Last assigned sequence number (0 = nothing published yet).
    sequence: AtomicU64,
    next_subscription: AtomicU64,
    registry: Mutex<BTreeMap<Topic, Vec<Arc<Subscription>>>>,
    tracker: Option<EventTracker>,
}

/// Shared handle to the bus. Clones dispatch through the same registry
/// and sequence counter.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus stamping envelopes with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::build(clock, None)
    }

    /// Create a bus that reports every dispatch to `tracker`.
    pub fn with_tracker(clock: Arc<dyn Clock>, tracker: EventTracker) -> Self {
        Self::build(clock, Some(tracker))
    }

    fn build(clock: Arc<dyn Clock>, tracker: Option<EventTracker>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                clock,
                sequence: AtomicU64::new(0),
                next_subscription: AtomicU64::new(1),
                registry: Mutex::new(BTreeMap::new()),
                tracker,
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, BTreeMap<Topic, Vec<Arc<Subscription>>>> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handler` for `topic`.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::SeqCst));
        let subscription = Arc::new(Subscription {
            id,
            handler: Arc::new(handler),
            active: AtomicBool::new(true),
        });
        self.registry().entry(topic).or_default().push(subscription);
        debug!(%topic, subscription = id.0, "Subscribed");
        id
    }

    /// Register a handler receiving the concrete payload type of `T`.
    pub fn on<T, F>(&self, handler: F) -> SubscriptionId
    where
        T: TopicEvent,
        F: Fn(&T, &EventEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(T::TOPIC, move |envelope| match envelope.payload_as::<T>() {
            Some(payload) => handler(payload, envelope),
            None => Ok(()),
        })
    }

    /// Remove a subscription. Unknown or already removed ids are ignored.
    ///
    /// Takes effect immediately, including for a dispatch already in flight.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut registry = self.registry();
        for subscriptions in registry.values_mut() {
            if let Some(pos) = subscriptions.iter().position(|s| s.id == id) {
                let removed = subscriptions.remove(pos);
                removed.active.store(false, Ordering::SeqCst);
                debug!(subscription = id.0, "Unsubscribed");
                return;
            }
        }
    }

    /// Publish an event.
    ///
    /// Always advances the sequence counter exactly once, even with no
    /// subscribers.
    pub fn publish(&self, payload: impl Into<EventPayload>) -> DispatchReport {
        let payload = payload.into();
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::stamp(payload, sequence, self.inner.clock.now_ms());
        let topic = envelope.topic();

        // Snapshot so handlers can touch the registry.
        let subscriptions: Vec<Arc<Subscription>> = self
            .registry()
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        let mut failed = 0;
        let started = Instant::now();

        for subscription in subscriptions {
            if !subscription.active.load(Ordering::SeqCst) {
                continue;
            }

            #[cfg(feature = "debug-tracing")]
            tracing::trace!(%topic, sequence, subscription = subscription.id.0, "Invoking handler");

            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| (subscription.handler)(&envelope)));
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    error!(
                        %topic,
                        sequence,
                        subscription = subscription.id.0,
                        "Handler failed: {:#}",
                        e
                    );
                }
                Err(panic) => {
                    failed += 1;
                    error!(
                        %topic,
                        sequence,
                        subscription = subscription.id.0,
                        "Handler panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        if let Some(tracker) = &self.inner.tracker {
            tracker.track(topic, started.elapsed().as_secs_f64() * 1000.0);
        }

        DispatchReport {
            envelope,
            delivered,
            failed,
        }
    }

    /// Last sequence number handed out (0 before the first publish).
    pub fn last_sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    /// Live subscriptions for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry().get(&topic).map_or(0, Vec::len)
    }

    /// Live subscriptions across all topics.
    pub fn total_subscribers(&self) -> usize {
        self.registry().values().map(Vec::len).sum()
    }

    /// Time source used for stamping.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("last_sequence", &self.last_sequence())
            .field("total_subscribers", &self.total_subscribers())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
