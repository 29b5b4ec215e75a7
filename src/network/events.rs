//! Per-browsing-context network request tracking.
//!
//! One [`NetworkEvents`] instance tracks every HTTP exchange of a single
//! browsing context through the `network.*` event stream:
//!
//! ```text
//! (absent) ──beforeRequestSent──► started ──responseCompleted──► completed
//!                                    │
//!                                    └───────fetchError─────────► error
//! ```
//!
//! Records are created once per request id, mutated in place by later
//! frames for the same id, and never deleted during the session; the map
//! doubles as the request history.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace, warn};

use crate::client::EventHandler;
use crate::identifiers::{BrowsingContextId, NetworkId};

// ============================================================================
// NetworkEventState
// ============================================================================

/// Lifecycle state of one tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEventState {
    /// Request sent, response not yet complete.
    Started,
    /// Response fully received.
    Completed,
    /// Request failed (network error, abort).
    Error,
}

impl fmt::Display for NetworkEventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

// ============================================================================
// NetworkEvent
// ============================================================================

/// State of one HTTP request/response exchange.
#[derive(Debug, Clone)]
pub struct NetworkEvent {
    /// Request id, unique within the browsing context.
    pub id: NetworkId,
    /// Request URL.
    pub url: String,
    /// HTTP method (GET, POST, ...).
    pub http_method: String,
    /// Lifecycle state.
    pub state: NetworkEventState,
    /// Timestamp of the first lifecycle frame (ms since epoch).
    pub start_timestamp: Option<u64>,
    /// Timestamp of the completing frame (ms since epoch).
    pub end_timestamp: Option<u64>,
    /// Protocol timing breakdown, as delivered by the remote end.
    pub timing: Option<Value>,
    /// HTTP status code, once headers arrived.
    pub http_status_code: Option<u16>,
    /// Response size in bytes, once completed.
    pub bytes_received: Option<u64>,
}

impl NetworkEvent {
    /// Returns `true` while the request has not finished.
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state == NetworkEventState::Started
    }
}

// ============================================================================
// NetworkEvents
// ============================================================================

/// Tracked requests, insertion-ordered.
#[derive(Default)]
struct EventTable {
    by_id: FxHashMap<NetworkId, NetworkEvent>,
    order: Vec<NetworkId>,
}

/// Network request state machine for one browsing context.
///
/// Fed from the dispatch path via [`handler`](Self::handler); queried and
/// awaited from caller threads. Frames for other contexts are ignored.
pub struct NetworkEvents {
    /// Context this instance tracks; the routing filter.
    context: BrowsingContextId,
    /// Tracked requests.
    events: Mutex<EventTable>,
}

impl NetworkEvents {
    /// Creates a tracker for one browsing context.
    #[must_use]
    pub fn new(context: impl Into<BrowsingContextId>) -> Self {
        Self {
            context: context.into(),
            events: Mutex::new(EventTable::default()),
        }
    }

    /// Returns the context this instance tracks.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &BrowsingContextId {
        &self.context
    }

    /// Returns an event handler feeding this tracker.
    ///
    /// Register it for the `network` family (or the individual lifecycle
    /// event names) on a client.
    #[must_use]
    pub fn handler(self: &Arc<Self>) -> EventHandler {
        let tracker = Arc::clone(self);
        Arc::new(move |frame| {
            tracker.handle_frame(frame);
            Ok(())
        })
    }

    /// Applies one inbound `network.*` frame to the state machine.
    ///
    /// Frames whose `context` does not match this instance are ignored.
    /// Lifecycle frames for an id never seen before (other than
    /// `beforeRequestSent`) are logged and dropped; out-of-order or
    /// foreign frames never fabricate a record.
    pub fn handle_frame(&self, frame: &Value) {
        let Some(method) = frame.get("method").and_then(Value::as_str) else {
            return;
        };
        let params = frame.get("params").unwrap_or(&Value::Null);

        let context = params.get("context").and_then(Value::as_str);
        if context != Some(self.context.as_str()) {
            trace!(method, ?context, "Frame for another context ignored");
            return;
        }

        let Some(request_id) = params
            .pointer("/request/request")
            .and_then(Value::as_str)
            .map(NetworkId::new)
        else {
            warn!(method, "Network frame without request id");
            return;
        };

        match method {
            "network.beforeRequestSent" => self.on_request_started(request_id, params),
            "network.responseStarted" => {
                self.update(request_id, method, |event| {
                    event.http_status_code = status_code(params);
                    event.timing = params.pointer("/request/timings").cloned();
                });
            }
            "network.responseCompleted" => {
                self.update(request_id, method, |event| {
                    event.state = NetworkEventState::Completed;
                    event.end_timestamp = timestamp(params);
                    event.http_status_code = status_code(params);
                    event.bytes_received = params
                        .pointer("/response/bytesReceived")
                        .and_then(Value::as_u64);
                });
            }
            "network.fetchError" => {
                self.update(request_id, method, |event| {
                    event.state = NetworkEventState::Error;
                    event.end_timestamp = timestamp(params);
                });
            }
            other => trace!(method = other, "Unhandled network event"),
        }
    }

    /// Returns a snapshot of one tracked request.
    #[must_use]
    pub fn get(&self, id: &NetworkId) -> Option<NetworkEvent> {
        self.events.lock().by_id.get(id).cloned()
    }

    /// Returns all tracked requests in first-seen order.
    #[must_use]
    pub fn all_events(&self) -> Vec<NetworkEvent> {
        let table = self.events.lock();
        table
            .order
            .iter()
            .filter_map(|id| table.by_id.get(id).cloned())
            .collect()
    }

    /// Returns the number of requests still in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.events
            .lock()
            .by_id
            .values()
            .filter(|event| event.is_in_flight())
            .count()
    }

    /// Waits until no tracked request is in flight.
    ///
    /// Network frames arrive on the dispatch path, not on this caller's
    /// thread, so this is a cooperative poll loop. On timeout it logs a
    /// warning and returns normally; unlike
    /// [`wait_until_open`](crate::client::ConnectionState::wait_until_open),
    /// expiry here is not an error.
    pub async fn wait_until_network_idle(&self, wait: Duration, poll_interval: Duration) {
        let deadline = Instant::now() + wait;

        loop {
            let in_flight = self.in_flight_count();
            if in_flight == 0 {
                info!(context = %self.context, "Network idle");
                return;
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    context = %self.context,
                    in_flight,
                    timeout_ms = wait.as_millis() as u64,
                    "Timed out waiting for network idle"
                );
                return;
            }

            sleep(poll_interval.min(deadline - now)).await;
        }
    }

    /// Handles `beforeRequestSent`: creates the record, or refreshes a
    /// known one (redirects re-enter the started state).
    fn on_request_started(&self, id: NetworkId, params: &Value) {
        let url = params
            .pointer("/request/url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let http_method = params
            .pointer("/request/method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut table = self.events.lock();
        if let Some(event) = table.by_id.get_mut(&id) {
            debug!(request = %id, url = %url, "Request re-entered started state");
            event.state = NetworkEventState::Started;
            event.url = url;
            return;
        }

        debug!(request = %id, url = %url, method = %http_method, "Request started");
        table.by_id.insert(
            id.clone(),
            NetworkEvent {
                id: id.clone(),
                url,
                http_method,
                state: NetworkEventState::Started,
                start_timestamp: timestamp(params),
                end_timestamp: None,
                timing: params.pointer("/request/timings").cloned(),
                http_status_code: None,
                bytes_received: None,
            },
        );
        table.order.push(id);
    }

    /// Applies `mutate` to a known record; warns and drops otherwise.
    fn update(&self, id: NetworkId, method: &str, mutate: impl FnOnce(&mut NetworkEvent)) {
        let mut table = self.events.lock();
        match table.by_id.get_mut(&id) {
            Some(event) => {
                mutate(event);
                debug!(request = %id, method, state = %event.state, "Request updated");
            }
            None => {
                warn!(request = %id, method, "Lifecycle frame for unknown request id");
            }
        }
    }
}

// ============================================================================
// Frame field helpers
// ============================================================================

fn timestamp(params: &Value) -> Option<u64> {
    params.get("timestamp").and_then(Value::as_u64)
}

fn status_code(params: &Value) -> Option<u16> {
    params
        .pointer("/response/status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
}

// ============================================================================
// Tests
// ============================================================================
