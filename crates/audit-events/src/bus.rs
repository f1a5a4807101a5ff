//! The concrete event bus: handlers are invoked synchronously, in
//! subscription order, on the publishing thread. Because every event
//! for a given URL is published from the single task that owns that
//! URL's lifecycle, handlers see a strictly ordered stream per URL
//! without the bus needing to track per-URL state itself.

use audit_types::{Event, EventPayload};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Receives every event published to the bus. Implementations must not
/// block for long — they run inline on the caller that published the
/// event, blocking the queue worker that owns the URL until they return.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

/// A handler built from a plain closure, for callers who don't need a
/// named type.
pub struct FnHandler<F>(F)
where
    F: Fn(&Event) + Send + Sync;

impl<F> FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle(&self, event: &Event) {
        (self.0)(event)
    }
}

/// In-memory, synchronous event bus (spec §4.G).
///
/// `publish` dispatches to every subscribed handler in registration
/// order before returning. There is no internal buffering and no
/// background task: a slow handler is back-pressure on the caller.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn subscribe_fn<F>(&self, f: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnHandler::new(f)));
    }

    /// Spec §4.G: a handler that panics is caught and logged, never
    /// propagated back to the emitter — the queue worker or orchestrator
    /// that published the event must not go down because a subscriber
    /// misbehaved.
    pub fn publish(&self, payload: EventPayload) {
        let event = Event::new(payload);
        for handler in self.handlers.read().iter() {
            let result = catch_unwind(AssertUnwindSafe(|| handler.handle(&event)));
            if let Err(panic) = result {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(event = event.payload.kind(), %message, "event handler panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_types::QueueStatistics;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn handlers_fire_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let order_a = order.clone();
        bus.subscribe_fn(move |_| order_a.lock().push("a"));
        let order_b = order.clone();
        bus.subscribe_fn(move |_| order_b.lock().push("b"));

        bus.publish(EventPayload::QueueEmpty);
        assert_eq!(*order.lock(), vec!["a", "b"]);
    }

    #[test]
    fn events_for_one_url_arrive_in_publish_order() {
        let bus = EventBus::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe_fn(move |event| seen_clone.lock().push(event.payload.kind().to_string()));

        let task_id = audit_types::TaskId::new();
        bus.publish(EventPayload::UrlStarted {
            task_id,
            url: "https://example.com".into(),
            attempt: 1,
        });
        bus.publish(EventPayload::Progress(QueueStatistics::default()));
        bus.publish(EventPayload::UrlCompleted {
            task_id,
            url: "https://example.com".into(),
            duration_ms: 10,
        });

        assert_eq!(*seen.lock(), vec!["url-started", "progress", "url-completed"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_later_handlers_or_propagate() {
        let bus = EventBus::new();
        bus.subscribe_fn(|_| panic!("boom"));
        let seen = Arc::new(parking_lot::Mutex::new(false));
        let seen_clone = seen.clone();
        bus.subscribe_fn(move |_| *seen_clone.lock() = true);

        bus.publish(EventPayload::QueueEmpty);

        assert!(*seen.lock());
    }

    #[test]
    fn no_subscribers_is_a_silent_no_op() {
        let count = AtomicUsize::new(0);
        let bus = EventBus::new();
        bus.publish(EventPayload::QueueEmpty);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }
}
