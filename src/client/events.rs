//! Named event listener registry with hierarchical dispatch.
//!
//! Protocol events use `module.eventName` namespaces. A listener registered
//! under the full name receives exactly that event; a listener registered
//! under the module prefix (`"network"`) receives every event in the family
//! (`"network.beforeRequestSent"`, `"network.responseCompleted"`, ...).
//!
//! Handlers run synchronously on the dispatch path and may be re-entrant:
//! a handler may register or remove listeners, or issue commands, while it
//! runs. The listener table lock is therefore never held across a handler
//! invocation.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::identifiers::ListenerId;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Receives the full inbound frame. An `Err` return propagates to the
/// dispatch caller after all handlers for the event have run.
pub type EventHandler = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Listener table: event name → handlers in registration order.
type ListenerMap = FxHashMap<String, Vec<(ListenerId, EventHandler)>>;

// ============================================================================
// EventManager
// ============================================================================

/// Generic named-listener registry.
///
/// Multiple handlers per name are allowed; dispatch preserves registration
/// order. Thread-safe; listeners may be added and removed concurrently
/// with dispatch.
#[derive(Default)]
pub struct EventManager {
    /// Registered listeners by event name.
    listeners: Mutex<ListenerMap>,
    /// Source of unique listener handles.
    next_listener: AtomicU64,
}

impl EventManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name` and returns its removal handle.
    pub fn on(&self, name: impl Into<String>, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let name = name.into();

        trace!(event = %name, listener = %id, "Registering listener");
        self.listeners
            .lock()
            .entry(name)
            .or_default()
            .push((id, handler));
        id
    }

    /// Removes the listener registered under `name` with handle `id`.
    ///
    /// Returns `true` if a listener was removed.
    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(name) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() < before;

        if entries.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    /// Invokes all listeners registered under `name`.
    ///
    /// If `name` contains a `.` separator, listeners registered under the
    /// prefix before the first `.` are invoked as well, after the
    /// exact-name listeners.
    ///
    /// Every matching handler runs even if an earlier one fails; the first
    /// error is returned afterwards.
    pub fn dispatch(&self, name: &str, frame: &Value) -> Result<()> {
        let handlers = self.matching_handlers(name);
        trace!(event = %name, count = handlers.len(), "Dispatching event");

        let mut first_error = None;
        for handler in handlers {
            if let Err(e) = handler(frame)
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Removes listeners for one name, or all listeners.
    pub fn clear(&self, name: Option<&str>) {
        let mut listeners = self.listeners.lock();
        match name {
            Some(name) => {
                listeners.remove(name);
            }
            None => listeners.clear(),
        }
    }

    /// Returns the number of listeners registered under `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.lock().get(name).map_or(0, Vec::len)
    }

    /// Collects handlers for `name` and its family prefix.
    ///
    /// Handlers are cloned out so the table lock is released before any
    /// handler runs.
    fn matching_handlers(&self, name: &str) -> Vec<EventHandler> {
        let listeners = self.listeners.lock();
        let mut handlers = Vec::new();

        if let Some(entries) = listeners.get(name) {
            handlers.extend(entries.iter().map(|(_, h)| Arc::clone(h)));
        }

        if let Some((prefix, _)) = name.split_once('.')
            && let Some(entries) = listeners.get(prefix)
        {
            handlers.extend(entries.iter().map(|(_, h)| Arc::clone(h)));
        }

        handlers
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler {
        Arc::new(move |_frame| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_exact_name_dispatch() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        events.on("log.entryAdded", counting_handler(Arc::clone(&hits)));

        events
            .dispatch("log.entryAdded", &json!({}))
            .expect("dispatch");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prefix_listener_receives_family_events() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        events.on("network", counting_handler(Arc::clone(&hits)));

        events
            .dispatch("network.responseStarted", &json!({}))
            .expect("dispatch");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // An unrelated family does not reach the listener.
        events
            .dispatch("log.entryAdded", &json!({}))
            .expect("dispatch");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_order_preserved() {
        let events = EventManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            events.on(
                "browsingContext.load",
                Arc::new(move |_| {
                    order.lock().push(tag);
                    Ok(())
                }),
            );
        }

        events
            .dispatch("browsingContext.load", &json!({}))
            .expect("dispatch");
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_off_removes_only_that_listener() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let keep = counting_handler(Arc::clone(&hits));
        let drop_ = counting_handler(Arc::clone(&hits));
        events.on("network", keep);
        let drop_id = events.on("network", drop_);

        assert!(events.off("network", drop_id));
        assert!(!events.off("network", drop_id));

        events
            .dispatch("network.beforeRequestSent", &json!({}))
            .expect("dispatch");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        events.on("a", counting_handler(Arc::clone(&hits)));
        events.on("b", counting_handler(Arc::clone(&hits)));

        events.clear(Some("a"));
        assert_eq!(events.listener_count("a"), 0);
        assert_eq!(events.listener_count("b"), 1);

        events.clear(None);
        assert_eq!(events.listener_count("b"), 0);
    }

    #[test]
    fn test_all_handlers_run_and_first_error_returned() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));

        events.on(
            "network",
            Arc::new(|_| Err(crate::error::Error::protocol("boom"))),
        );
        events.on("network", counting_handler(Arc::clone(&hits)));

        let err = events
            .dispatch("network.authRequired", &json!({}))
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Protocol { .. }));
        // The failing handler did not stop the second one.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_registration_from_handler() {
        let events = Arc::new(EventManager::new());
        let inner = Arc::clone(&events);
        let hits = Arc::new(AtomicUsize::new(0));
        let inner_hits = Arc::clone(&hits);

        events.on(
            "session.new",
            Arc::new(move |_| {
                inner.on("session.end", counting_handler(Arc::clone(&inner_hits)));
                Ok(())
            }),
        );

        events.dispatch("session.new", &json!({})).expect("dispatch");
        assert_eq!(events.listener_count("session.end"), 1);
    }
}
