//! WebDriver BiDi protocol engine for PDF rendering.
//!
//! This library drives a remote browser over one WebSocket connection
//! (a subset of the WebDriver BiDi protocol) to render pages and capture
//! network activity for PDF generation.
//!
//! # Architecture
//!
//! - **Local End (Rust)**: sends commands, receives responses and events
//! - **Remote End (browser driver)**: executes commands, emits events
//!
//! Key design principles:
//!
//! - One shared socket multiplexes many concurrent in-flight commands;
//!   each command owns its own response slot, so there is no head-of-line
//!   blocking between unrelated commands
//! - Event listeners run on the dispatch path and may themselves issue
//!   blocking commands: response delivery for a different id never needs
//!   the dispatch path to be free
//! - Hierarchical event namespaces: a listener on `"network"` receives
//!   every `"network.*"` event
//!
//! The session-establishment handshake is an external collaborator; this
//! crate takes a ready `ws`/`wss` URL string as opaque input.
//! Reconnection after a dropped socket is not modeled; create a new
//! [`Client`] instead.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use bidi_client::{Client, NetworkEvents, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("ws://127.0.0.1:9222/session");
//!     client.start().await?;
//!     client.wait_until_open(Duration::from_secs(10)).await?;
//!
//!     // Track network activity for one browsing context.
//!     let network = Arc::new(NetworkEvents::new("ctx-1"));
//!     client.on_event(&["network"], network.handler()).await?;
//!
//!     // ... navigate, then wait for the page to settle:
//!     network
//!         .wait_until_network_idle(Duration::from_secs(30), Duration::from_millis(100))
//!         .await;
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client facade, command correlation, event dispatch |
//! | [`network`] | Network request tracking and interception |
//! | [`protocol`] | Wire message types (commands, frames, redaction) |
//! | [`transport`] | WebSocket transport layer (internal) |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe id wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Protocol client: connection state, command correlation, event dispatch.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible ids at compile time.
pub mod identifiers;

/// Network request tracking and interception.
pub mod network;

/// BiDi protocol message types.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, CommandManager, ConnectionState, EventHandler, EventManager, WebSocketDispatcher};

// Network types
pub use network::{
    AddHeadersInterceptor, AuthInterceptor, Interceptor, NetworkEvent, NetworkEventState,
    NetworkEvents,
};

// Protocol types
pub use protocol::{
    AuthCredentials, BrowserCommand, BrowsingContextCommand, BytesValue, Command, CommandFrame,
    ContextKind, ContinueWithAuthAction, CookieParams, EvaluateTarget, Frame, Header,
    InterceptPhase, NetworkCommand, RawCommand, ReadinessState, ResponseFrame, ScriptCommand,
    SessionCommand, StorageCommand, UrlPattern,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{BrowsingContextId, CommandId, InterceptId, ListenerId, NetworkId};
