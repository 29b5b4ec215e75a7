//! Error types for the BiDi protocol engine.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use bidi_client::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.wait_until_open(std::time::Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Lifecycle | [`Error::NotStarted`] |
//! | Command | [`Error::CommandTimeout`], [`Error::CommandError`], [`Error::ResponseSlotMissing`] |
//! | Protocol | [`Error::InvalidArgument`], [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection cannot be established or a send fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection open not observed in time.
    ///
    /// Returned by `wait_until_open` when the deadline passes while the
    /// socket is still not connected.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed.
    ///
    /// Returned when the connection is lost during an operation; all
    /// pending commands fail with this on shutdown.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Command issued before the client was started.
    #[error("Client not started: call start() before sending commands")]
    NotStarted,

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// No response arrived for a command within the timeout.
    #[error("Command {id} timed out after {timeout_ms}ms")]
    CommandTimeout {
        /// The command id that timed out.
        id: CommandId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The remote end answered a command with an error envelope.
    ///
    /// Carries the server's error payload verbatim.
    #[error("Command {id} failed: {payload}")]
    CommandError {
        /// The command id the error responds to.
        id: CommandId,
        /// Server error payload (the full error frame).
        payload: Value,
    },

    /// Response pop attempted for an id with no registered slot.
    ///
    /// The id was never requested with response storage, was already
    /// consumed, or is unknown. Distinct from [`Error::CommandTimeout`].
    #[error("No response slot registered for command {id}")]
    ResponseSlotMissing {
        /// The command id with no slot.
        id: CommandId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Invalid argument.
    ///
    /// Returned when a caller-supplied value is rejected locally, before
    /// anything is sent to the remote end.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Protocol violation or unexpected message format.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a command timeout error.
    #[inline]
    pub fn command_timeout(id: CommandId, timeout_ms: u64) -> Self {
        Self::CommandTimeout { id, timeout_ms }
    }

    /// Creates a command error carrying the server payload.
    #[inline]
    pub fn command_error(id: CommandId, payload: Value) -> Self {
        Self::CommandError { id, payload }
    }

    /// Creates a missing-response-slot error.
    #[inline]
    pub fn response_slot_missing(id: CommandId) -> Self {
        Self::ResponseSlotMissing { id }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::CommandTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the remote end rejected the command.
    #[inline]
    #[must_use]
    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::CommandError { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
