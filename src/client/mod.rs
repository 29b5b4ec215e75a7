//! Protocol client: connection state, command correlation, event dispatch.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── Client ────────────────────────┐
//! │  ConnectionState   CommandManager   WebSocketDispatcher │
//! │   (open latch)     (id allocation,   (socket events /   │
//! │                     response slots)   session events)   │
//! └────────────────────────────┬────────────────────────────┘
//!                              │ text frames
//!                         Transport (I/O loop)
//! ```
//!
//! Inbound frames arrive on the transport's reader task and are
//! demultiplexed by the dispatcher: frames with a `method` fan out to
//! session-event listeners, frames without one reach the command
//! manager's pending-response slots via the socket `message` event.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket-open state tracking |
//! | `commands` | Command transmission and response correlation |
//! | `events` | Named listener registry with hierarchical dispatch |
//! | `dispatcher` | Inbound frame demultiplexing |
//! | `core` | Public client facade |

// ============================================================================
// Submodules
// ============================================================================

/// Command transmission and response correlation.
pub mod commands;

/// Socket-open state tracking.
pub mod connection;

/// Client facade.
pub mod core;

/// Inbound frame demultiplexing.
pub mod dispatcher;

/// Named event listener registry.
pub mod events;

// ============================================================================
// Re-exports
// ============================================================================

pub use commands::CommandManager;
pub use connection::ConnectionState;
pub use core::Client;
pub use dispatcher::WebSocketDispatcher;
pub use events::{EventHandler, EventManager};
