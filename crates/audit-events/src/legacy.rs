//! Adapter for callers still using the pre-bus callback signature
//! `fn(event_name: &str, payload: serde_json::Value)`. Emits one
//! deprecation warning the first time it fires per process, unless
//! suppressed (spec §4.G, §6).

use crate::bus::EventHandler;
use audit_types::Event;
use std::sync::Once;

/// `true` when the deprecation notice should be swallowed: under CI,
/// under `NODE_ENV=production`, or when explicitly silenced.
fn suppress_deprecation_notice() -> bool {
    std::env::var("AUDITMYSITE_SUPPRESS_DEPRECATIONS").is_ok()
        || std::env::var("CI").is_ok()
        || std::env::var("NODE_ENV").as_deref() == Ok("production")
}

static WARN_ONCE: Once = Once::new();

/// Wraps a legacy callback as an [`EventHandler`], converting each
/// [`Event`] to its `(name, json)` shape.
pub struct LegacyCallbackAdapter<F>
where
    F: Fn(&str, serde_json::Value) + Send + Sync,
{
    callback: F,
}

impl<F> LegacyCallbackAdapter<F>
where
    F: Fn(&str, serde_json::Value) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }

    fn warn_deprecated(&self) {
        if suppress_deprecation_notice() {
            return;
        }
        WARN_ONCE.call_once(|| {
            tracing::warn!(
                "the (event_name, payload) callback API is deprecated; subscribe to the \
                 event bus directly. Set AUDITMYSITE_SUPPRESS_DEPRECATIONS=1 to silence this."
            );
        });
    }
}

impl<F> EventHandler for LegacyCallbackAdapter<F>
where
    F: Fn(&str, serde_json::Value) + Send + Sync,
{
    fn handle(&self, event: &Event) {
        self.warn_deprecated();
        let name = event.payload.kind();
        let json = serde_json::to_value(&event.payload).unwrap_or(serde_json::Value::Null);
        (self.callback)(name, json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use audit_types::EventPayload;
    use std::sync::{Arc, Mutex};

    #[test]
    fn legacy_adapter_receives_name_and_json_payload() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let adapter = LegacyCallbackAdapter::new(move |name, json| {
            *seen_clone.lock().unwrap() = Some((name.to_string(), json));
        });

        let bus = EventBus::new();
        bus.subscribe(Arc::new(adapter));
        bus.publish(EventPayload::QueueEmpty);

        let (name, _json) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(name, "queue-empty");
    }
}
