//! Command transmission and response correlation.
//!
//! Every outbound command gets a strictly increasing integer id. A caller
//! that wants the response registers a *pending-response slot* for that id:
//! a single-consumer channel the dispatch path pushes the matching frame
//! into. Each in-flight command owns its own slot, so unrelated commands
//! never block each other and a handler running on the dispatch path can
//! itself wait for a response delivered by a later inbound frame.
//!
//! [`send_cmd`](CommandManager::send_cmd) is synchronous: transmission is
//! an unbounded channel send into the writer task, so event handlers can
//! issue commands without blocking the dispatch path.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::{Command, CommandFrame, redacted};

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending commands before rejecting new ones.
const MAX_PENDING_COMMANDS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// Dispatch side of the slot registry: id → frame sender.
type PendingMap = FxHashMap<CommandId, oneshot::Sender<Value>>;

/// Consumer side of the slot registry: id → frame receiver.
type SlotMap = FxHashMap<CommandId, oneshot::Receiver<Value>>;

// ============================================================================
// CommandManager
// ============================================================================

/// Allocates command ids, transmits commands and correlates responses.
///
/// # Thread Safety
///
/// `CommandManager` is `Send + Sync`; ids never collide under concurrent
/// senders and each response is delivered to exactly one waiter.
pub struct CommandManager {
    /// Monotonic id source, shared by all senders.
    next_id: AtomicU64,
    /// Senders the dispatch path pushes matching frames into.
    pending: Mutex<PendingMap>,
    /// Receivers waiting callers pop frames out of.
    slots: Mutex<SlotMap>,
    /// Outbound frame sink, installed when the transport opens.
    sink: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager {
    /// Creates a manager with no transport attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(PendingMap::default()),
            slots: Mutex::new(SlotMap::default()),
            sink: Mutex::new(None),
        }
    }

    /// Attaches the outbound frame sink of an open transport.
    pub(crate) fn install_sink(&self, sink: mpsc::UnboundedSender<String>) {
        *self.sink.lock() = Some(sink);
    }

    /// Detaches the outbound sink; subsequent sends fail with `NotStarted`.
    pub(crate) fn clear_sink(&self) {
        *self.sink.lock() = None;
    }

    /// Serializes and transmits a command, returning its assigned id.
    ///
    /// With `store_response` a pending-response slot is registered for the
    /// id before transmission, to be consumed via
    /// [`pop_response`](Self::pop_response).
    ///
    /// The frame is logged at debug level with sensitive values redacted.
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] if no transport is attached
    /// - [`Error::Protocol`] if too many commands are already pending
    /// - [`Error::ConnectionClosed`] if the transport has shut down
    pub fn send_cmd(&self, command: Command, store_response: bool) -> Result<CommandId> {
        let sink = self
            .sink
            .lock()
            .as_ref()
            .cloned()
            .ok_or(Error::NotStarted)?;

        let id = CommandId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let frame = CommandFrame::new(id, command);
        let value = serde_json::to_value(&frame)?;

        debug!(%id, frame = %redacted(&value), "Sending command");

        if store_response {
            let (tx, rx) = oneshot::channel();
            {
                // Cap check and insert share one lock acquisition;
                // concurrent senders cannot overshoot the cap.
                let mut pending = self.pending.lock();
                if pending.len() >= MAX_PENDING_COMMANDS {
                    warn!(
                        pending = pending.len(),
                        max = MAX_PENDING_COMMANDS,
                        "Too many pending commands"
                    );
                    return Err(Error::protocol(format!(
                        "Too many pending commands: {}/{}",
                        pending.len(),
                        MAX_PENDING_COMMANDS
                    )));
                }
                pending.insert(id, tx);
            }
            self.slots.lock().insert(id, rx);
        }

        if sink.send(value.to_string()).is_err() {
            // Writer task is gone; clean up the slot we just registered.
            self.pending.lock().remove(&id);
            self.slots.lock().remove(&id);
            return Err(Error::ConnectionClosed);
        }

        trace!(%id, "Command queued for transmission");
        Ok(id)
    }

    /// Sends a command and waits for its response frame.
    ///
    /// The response slot is always removed afterwards, success or failure.
    ///
    /// # Errors
    ///
    /// - [`Error::CommandTimeout`] if no response arrives within `wait`
    /// - [`Error::CommandError`] if the response carries an `error` field
    ///   (the server payload is attached)
    /// - plus any [`send_cmd`](Self::send_cmd) error
    pub async fn send_cmd_and_wait(&self, command: Command, wait: Duration) -> Result<Value> {
        let id = self.send_cmd(command, true)?;
        let frame = self.pop_response(id, wait).await?;

        if frame.get("error").is_some() {
            return Err(Error::command_error(id, frame));
        }
        Ok(frame)
    }

    /// Delivers a response frame to its registered slot.
    ///
    /// Returns `true` if a slot claimed the frame; `false` means the frame
    /// is unsolicited (never requested, already consumed, or unknown) and
    /// the caller should log it.
    pub fn handle_response(&self, frame: &Value) -> bool {
        let Some(id) = frame.get("id").and_then(Value::as_u64).map(CommandId) else {
            return false;
        };

        let Some(tx) = self.pending.lock().remove(&id) else {
            return false;
        };

        trace!(%id, "Response correlated");
        // The waiter may have timed out between our removal and this send;
        // last write governs, the frame is simply dropped.
        let _ = tx.send(frame.clone());
        true
    }

    /// Pops the response frame for `id`, waiting up to `wait`.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseSlotMissing`] if no slot is registered for `id`
    ///   (distinct from a timeout)
    /// - [`Error::CommandTimeout`] if the slot stays empty past `wait`
    /// - [`Error::ConnectionClosed`] if the transport shut down first
    pub async fn pop_response(&self, id: CommandId, wait: Duration) -> Result<Value> {
        let rx = self
            .slots
            .lock()
            .remove(&id)
            .ok_or(Error::ResponseSlotMissing { id })?;

        match timeout(wait, rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => {
                self.pending.lock().remove(&id);
                Err(Error::ConnectionClosed)
            }
            Err(_) => {
                // A frame arriving after this point is treated as
                // unsolicited and logged by the dispatch path.
                self.pending.lock().remove(&id);
                Err(Error::command_timeout(id, wait.as_millis() as u64))
            }
        }
    }

    /// Returns the number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fails all pending commands with `ConnectionClosed`.
    ///
    /// Called when the transport shuts down; waiting callers wake
    /// immediately instead of running into their timeouts.
    pub(crate) fn fail_pending(&self) {
        let pending: Vec<_> = self.pending.lock().drain().collect();
        let count = pending.len();
        drop(pending); // Dropping the senders wakes the receivers.

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
