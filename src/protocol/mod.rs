//! BiDi protocol message types.
//!
//! This module defines the wire format exchanged between the local end
//! (this crate) and the remote end (the browser driver) over one
//! WebSocket connection.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Shape |
//! |-------|-----------|-------|
//! | Command | Local → Remote | `{id, method, params}` |
//! | Response | Remote → Local | `{id, result}` / `{id, error}` |
//! | Event | Remote → Local | `{method, params}` (no `id`) |
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `session.subscribe`
//! - `browsingContext.print`
//! - `network.continueWithAuth`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed commands by protocol module |
//! | `frame` | Outbound envelope and inbound frame classification |
//! | `redact` | Sensitive-value redaction for frame logging |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by protocol module.
pub mod command;

/// Wire frame types.
pub mod frame;

/// Sensitive-value redaction for outbound frame logging.
pub mod redact;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    AuthCredentials, BrowserCommand, BrowsingContextCommand, BytesValue, Command, ContextKind,
    ContinueWithAuthAction, CookieParams, EvaluateTarget, Header, InterceptPhase, NetworkCommand,
    RawCommand, ReadinessState, ScriptCommand, SessionCommand, StorageCommand, UrlPattern,
};
pub use frame::{CommandFrame, Frame, ResponseFrame};
pub use redact::redacted;
