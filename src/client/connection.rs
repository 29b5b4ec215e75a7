//! Socket-open state tracking.
//!
//! One-way state machine: `NOT_CONNECTED → CONNECTED`. There is no
//! disconnect transition; a fresh connection requires a fresh instance.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// ConnectionState
// ============================================================================

/// Tracks whether the socket has been observed open.
///
/// Callers block in [`wait_until_open`](Self::wait_until_open) until the
/// transport reports the connection established. All concurrent waiters
/// wake together on connect. Clones observe the same state.
#[derive(Clone)]
pub struct ConnectionState {
    connected_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    /// Creates a state tracker in the not-connected state.
    #[must_use]
    pub fn new() -> Self {
        let (connected_tx, connected_rx) = watch::channel(false);
        Self {
            connected_tx,
            connected_rx,
        }
    }

    /// Marks the connection open and wakes all waiters.
    ///
    /// Idempotent; repeated calls have no further effect.
    pub fn mark_connected(&self) {
        if !*self.connected_rx.borrow() {
            debug!("Connection marked open");
        }
        self.connected_tx.send_replace(true);
    }

    /// Returns `true` once [`mark_connected`](Self::mark_connected) ran.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// Blocks until the connection is open or `wait` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`] if the deadline passes while
    /// still not connected.
    pub async fn wait_until_open(&self, wait: Duration) -> Result<()> {
        let mut rx = self.connected_rx.clone();

        timeout(wait, rx.wait_for(|connected| *connected))
            .await
            .map_err(|_| Error::connection_timeout(wait.as_millis() as u64))?
            .map_err(|_| Error::ConnectionClosed)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
