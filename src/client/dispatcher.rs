//! Inbound frame demultiplexing.
//!
//! The dispatcher owns two independent listener registries:
//!
//! - **socket events**: raw transport lifecycle (`open`, `close`,
//!   `error`, and the generic `message` for frames without a `method`)
//! - **session events**: decoded protocol events, keyed by method name
//!
//! Command responses never carry a `method`, so they surface as socket
//! `message` events; that is how they reach the pending-response registry.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::warn;

use crate::client::events::{EventHandler, EventManager};
use crate::error::Result;
use crate::identifiers::ListenerId;
use crate::protocol::Frame;

// ============================================================================
// WebSocketDispatcher
// ============================================================================

/// Demultiplexes inbound frames between socket and session listeners.
#[derive(Default)]
pub struct WebSocketDispatcher {
    /// Raw socket lifecycle listeners.
    socket_events: EventManager,
    /// Decoded protocol event listeners, keyed by method name.
    session_events: EventManager,
}

impl WebSocketDispatcher {
    /// Creates a dispatcher with empty listener tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Inbound routing
    // ========================================================================

    /// Routes one inbound text frame.
    ///
    /// Frames carrying a `method` fan out through the session listeners
    /// under that method name (with family-prefix dispatch). Frames
    /// without one are command responses and fan out as socket `message`
    /// events. Unparseable frames are logged and dropped.
    ///
    /// # Errors
    ///
    /// Propagates the first handler error, after all handlers ran.
    pub fn dispatch_frame(&self, text: &str) -> Result<()> {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, text, "Failed to parse inbound frame");
                return Ok(());
            }
        };

        match frame {
            Frame::Event { method, frame } => self.session_events.dispatch(&method, &frame),
            Frame::Response(frame) => self.socket_events.dispatch("message", &frame),
        }
    }

    /// Dispatches a socket lifecycle event (`open`, `close`, `error`).
    pub fn dispatch_socket_event(&self, name: &str, frame: &Value) -> Result<()> {
        self.socket_events.dispatch(name, frame)
    }

    // ========================================================================
    // Socket-level listeners
    // ========================================================================

    /// Registers a listener for the socket `open` event.
    pub fn on_open(&self, handler: EventHandler) -> ListenerId {
        self.socket_events.on("open", handler)
    }

    /// Registers a listener for the socket `close` event.
    pub fn on_close(&self, handler: EventHandler) -> ListenerId {
        self.socket_events.on("close", handler)
    }

    /// Registers a listener for the socket `error` event.
    pub fn on_error(&self, handler: EventHandler) -> ListenerId {
        self.socket_events.on("error", handler)
    }

    /// Registers a listener for frames without a `method` (responses).
    pub fn on_message(&self, handler: EventHandler) -> ListenerId {
        self.socket_events.on("message", handler)
    }

    /// Removes a socket-level listener.
    pub fn remove_socket_listener(&self, name: &str, id: ListenerId) -> bool {
        self.socket_events.off(name, id)
    }

    // ========================================================================
    // Session-level listeners
    // ========================================================================

    /// Registers a listener for a protocol event name or family prefix.
    pub fn on_event(&self, name: impl Into<String>, handler: EventHandler) -> ListenerId {
        self.session_events.on(name, handler)
    }

    /// Removes a session-level listener.
    pub fn remove_event_listener(&self, name: &str, id: ListenerId) -> bool {
        self.session_events.off(name, id)
    }

    /// Removes all listeners from both registries.
    pub fn clear(&self) {
        self.socket_events.clear(None);
        self.session_events.clear(None);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_event_frames_route_to_session_listeners() {
        let dispatcher = WebSocketDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        dispatcher.on_event(
            "network.beforeRequestSent",
            Arc::new(move |frame| {
                sink.lock().push(frame.clone());
                Ok(())
            }),
        );

        dispatcher
            .dispatch_frame(r#"{"method": "network.beforeRequestSent", "params": {"request": {}}}"#)
            .expect("dispatch");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["method"], "network.beforeRequestSent");
    }

    #[test]
    fn test_response_frames_route_to_message_listeners() {
        let dispatcher = WebSocketDispatcher::new();
        let messages = Arc::new(AtomicUsize::new(0));
        let session_hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&messages);
        dispatcher.on_message(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let counter = Arc::clone(&session_hits);
        dispatcher.on_event(
            "network",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        dispatcher
            .dispatch_frame(r#"{"id": 7, "result": {}}"#)
            .expect("dispatch");

        assert_eq!(messages.load(Ordering::SeqCst), 1);
        assert_eq!(session_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unparseable_frame_dropped() {
        let dispatcher = WebSocketDispatcher::new();
        dispatcher.dispatch_frame("{garbage").expect("dropped, not an error");
    }

    #[test]
    fn test_socket_lifecycle_events() {
        let dispatcher = WebSocketDispatcher::new();
        let opened = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&opened);
        let id = dispatcher.on_open(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        dispatcher
            .dispatch_socket_event("open", &json!(null))
            .expect("dispatch");
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        assert!(dispatcher.remove_socket_listener("open", id));
        dispatcher
            .dispatch_socket_event("open", &json!(null))
            .expect("dispatch");
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_event_listener() {
        let dispatcher = WebSocketDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = dispatcher.on_event(
            "log.entryAdded",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        assert!(dispatcher.remove_event_listener("log.entryAdded", id));
        dispatcher
            .dispatch_frame(r#"{"method": "log.entryAdded", "params": {}}"#)
            .expect("dispatch");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
