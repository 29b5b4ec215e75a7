//! WebSocket transport layer.
//!
//! Connects to the WebSocket URL supplied by the session-establishment
//! collaborator and runs the socket I/O loop. Everything above this layer
//! sees only text frames: outbound through an unbounded sink, inbound
//! through the dispatcher callback.
//!
//! # Connection Lifecycle
//!
//! 1. [`Transport::open`]: handshake against the `ws`/`wss` endpoint
//! 2. Reader/writer loop: frames in, frames out, lifecycle events
//! 3. [`Transport::close`]: graceful shutdown driven by the owner
//!
//! Reconnection is not modeled; a dropped socket requires a new client.

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and I/O loop.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use socket::Transport;
