// crates/core/src/jobs/bus.rs
//! Per-job publish/subscribe of stage events.
//!
//! Topics are job ids. Delivery is synchronous in the publisher's context,
//! in subscription order, to the subscribers present when `publish` takes
//! its snapshot. Nothing is buffered: a late subscriber never sees earlier
//! events.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::types::{JobId, StageEvent};
use crate::error::SubscriptionError;

/// Callback invoked for each event on a subscribed topic.
pub type Handler = Arc<dyn Fn(&StageEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]. Routing only; it does not
/// own the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    topic: JobId,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &JobId {
        &self.topic
    }
}

struct Subscriber {
    id: u64,
    handler: Handler,
}

/// Process-wide event bus, constructed at startup and shut down on exit.
///
/// Each topic's subscriber list sits behind its map shard lock, so
/// subscribe, unsubscribe and the publish snapshot are mutually exclusive
/// per topic. Handlers run outside the lock and may unsubscribe themselves.
pub struct EventBus {
    next_id: AtomicU64,
    topics: DashMap<JobId, Vec<Subscriber>>,
    closed: AtomicBool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            topics: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register `handler` for every future event on `topic`.
    pub fn subscribe<F>(&self, topic: JobId, handler: F) -> Result<Subscription, SubscriptionError>
    where
        F: Fn(&StageEvent) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(SubscriptionError::BusClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.topics.entry(topic.clone()).or_default().push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        let subscription = Subscription { id, topic };

        // Lost a race with shutdown: undo so nothing outlives the bus.
        if self.is_closed() {
            self.unsubscribe(&subscription);
            return Err(SubscriptionError::BusClosed);
        }

        tracing::debug!(job_id = %subscription.topic, subscription = id, "subscribed");
        Ok(subscription)
    }

    /// Remove a subscription. Calling it again, or after shutdown, is a no-op.
    /// A handler already running for an in-flight publish finishes normally.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let _ = self.remove(subscription);
    }

    /// Like [`unsubscribe`](Self::unsubscribe), but reports handles that are
    /// not live.
    pub fn try_unsubscribe(&self, subscription: &Subscription) -> Result<(), SubscriptionError> {
        if self.remove(subscription) {
            Ok(())
        } else {
            Err(SubscriptionError::Released {
                id: subscription.id,
            })
        }
    }

    fn remove(&self, subscription: &Subscription) -> bool {
        let removed = match self.topics.get_mut(&subscription.topic) {
            Some(mut subscribers) => {
                let before = subscribers.len();
                subscribers.retain(|s| s.id != subscription.id);
                subscribers.len() != before
            }
            None => false,
        };
        self.topics
            .remove_if(&subscription.topic, |_, subscribers| subscribers.is_empty());

        if removed {
            tracing::debug!(
                job_id = %subscription.topic,
                subscription = subscription.id,
                "unsubscribed"
            );
        }
        removed
    }

    /// Deliver `event` to every current subscriber of `topic`, in
    /// subscription order. A panicking handler is logged and skipped; the
    /// rest still receive the event. Returns the number of handlers that
    /// completed.
    pub fn publish(&self, topic: &JobId, event: &StageEvent) -> usize {
        let handlers: Vec<Handler> = match self.topics.get(topic) {
            Some(subscribers) => subscribers.iter().map(|s| Arc::clone(&s.handler)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    metrics::counter!("glassbox_handler_panics_total").increment(1);
                    tracing::warn!(
                        job_id = %topic,
                        stage = %event.stage,
                        "event handler panicked; continuing delivery"
                    );
                }
            }
        }
        delivered
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &JobId) -> usize {
        self.topics.get(topic).map(|s| s.len()).unwrap_or(0)
    }

    /// Drop every subscriber and refuse new ones. Publishing afterwards
    /// reaches nobody.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let topics = self.topics.len();
        self.topics.clear();
        tracing::info!(topics, "event bus shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::Stage;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn event(job: &str, stage: Stage, progress: u8) -> StageEvent {
        StageEvent::new(JobId::new(job), stage, "msg", progress)
    }

    fn recorder() -> (Arc<Mutex<Vec<StageEvent>>>, impl Fn(&StageEvent) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: &StageEvent| sink.lock().unwrap().push(e.clone()))
    }

    #[test]
    fn test_publish_reaches_subscribers_in_order() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        let (a, handler_a) = recorder();
        let (b, handler_b) = recorder();
        bus.subscribe(topic.clone(), handler_a).unwrap();
        bus.subscribe(topic.clone(), handler_b).unwrap();

        let events = vec![
            event("job", Stage::Uploaded, 10),
            event("job", Stage::OcrProcessing, 30),
            event("job", Stage::Completed, 100),
        ];
        for e in &events {
            assert_eq!(bus.publish(&topic, e), 2);
        }

        assert_eq!(*a.lock().unwrap(), events);
        assert_eq!(*b.lock().unwrap(), events);
    }

    #[test]
    fn test_subscription_order_within_a_publish() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = Arc::clone(&order);
            bus.subscribe(topic.clone(), move |_| order.lock().unwrap().push(n))
                .unwrap();
        }
        bus.publish(&topic, &event("job", Stage::Uploaded, 10));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_no_replay_for_late_subscriber() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        bus.publish(&topic, &event("job", Stage::Uploaded, 10));

        let (seen, handler) = recorder();
        bus.subscribe(topic.clone(), handler).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        bus.publish(&topic, &event("job", Stage::OcrProcessing, 30));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe(JobId::new("a"), handler).unwrap();
        assert_eq!(bus.publish(&JobId::new("b"), &event("b", Stage::Uploaded, 10)), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        let (seen, handler) = recorder();
        let sub = bus.subscribe(topic.clone(), handler).unwrap();

        bus.publish(&topic, &event("job", Stage::Uploaded, 10));
        bus.unsubscribe(&sub);
        bus.unsubscribe(&sub);
        bus.publish(&topic, &event("job", Stage::OcrProcessing, 30));

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(bus.subscriber_count(&topic), 0);
    }

    #[test]
    fn test_try_unsubscribe_reports_released_handle() {
        let bus = EventBus::new();
        let sub = bus.subscribe(JobId::new("job"), |_| {}).unwrap();
        assert!(bus.try_unsubscribe(&sub).is_ok());
        assert_eq!(
            bus.try_unsubscribe(&sub),
            Err(SubscriptionError::Released { id: sub.id() })
        );
    }

    #[test]
    fn test_unsubscribe_leaves_other_subscribers() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        let (kept, handler) = recorder();
        let dropped = bus.subscribe(topic.clone(), |_| {}).unwrap();
        bus.subscribe(topic.clone(), handler).unwrap();

        bus.unsubscribe(&dropped);
        assert_eq!(bus.subscriber_count(&topic), 1);
        assert_eq!(bus.publish(&topic, &event("job", Stage::Uploaded, 10)), 1);
        assert_eq!(kept.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        bus.subscribe(topic.clone(), |_| panic!("boom")).unwrap();
        let (seen, handler) = recorder();
        bus.subscribe(topic.clone(), handler).unwrap();

        let delivered = bus.publish(&topic, &event("job", Stage::Uploaded, 10));
        assert_eq!(delivered, 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself_during_publish() {
        let bus = Arc::new(EventBus::new());
        let topic = JobId::new("job");
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let count = Arc::new(AtomicU64::new(0));
        let sub = {
            let bus = Arc::clone(&bus);
            let slot = Arc::clone(&slot);
            let count = Arc::clone(&count);
            bus.clone()
                .subscribe(topic.clone(), move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                    if let Some(sub) = slot.lock().unwrap().take() {
                        bus.unsubscribe(&sub);
                    }
                })
                .unwrap()
        };
        *slot.lock().unwrap() = Some(sub);

        bus.publish(&topic, &event("job", Stage::Uploaded, 10));
        bus.publish(&topic, &event("job", Stage::OcrProcessing, 30));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(&topic), 0);
    }

    #[test]
    fn test_shutdown_drops_subscribers_and_refuses_new_ones() {
        let bus = EventBus::new();
        let topic = JobId::new("job");
        let (seen, handler) = recorder();
        let sub = bus.subscribe(topic.clone(), handler).unwrap();

        bus.shutdown();
        assert!(bus.is_closed());
        assert_eq!(bus.publish(&topic, &event("job", Stage::Uploaded, 10)), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(
            bus.subscribe(topic.clone(), |_| {}).unwrap_err(),
            SubscriptionError::BusClosed
        );
        // Releasing a handle after shutdown is still fine.
        bus.unsubscribe(&sub);
    }

    #[test]
    fn test_concurrent_subscribe_and_publish() {
        let bus = Arc::new(EventBus::new());
        let topic = JobId::new("job");
        let received = Arc::new(AtomicU64::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let bus = Arc::clone(&bus);
                let topic = topic.clone();
                let received = Arc::clone(&received);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let received = Arc::clone(&received);
                        let sub = bus
                            .subscribe(topic.clone(), move |_| {
                                received.fetch_add(1, Ordering::Relaxed);
                            })
                            .unwrap();
                        bus.publish(&topic, &event("job", Stage::Uploaded, 10));
                        bus.unsubscribe(&sub);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(bus.subscriber_count(&topic), 0);
        // Each publish saw at least its own publisher's subscription.
        assert!(received.load(Ordering::Relaxed) >= 800);
    }
}
