//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible ids at compile time:
//! a [`NetworkId`] can never be passed where a [`CommandId`] is expected.
//!
//! | Type | Backing | Assigned by |
//! |------|---------|-------------|
//! | [`CommandId`] | `u64` | local end (monotonic counter) |
//! | [`BrowsingContextId`] | `String` | remote end |
//! | [`NetworkId`] | `String` | remote end |
//! | [`InterceptId`] | `String` | remote end |
//! | [`ListenerId`] | `u64` | local end (EventManager) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Identifier correlating a command with its response.
///
/// Allocated by [`CommandManager`](crate::client::CommandManager) from a
/// strictly increasing atomic counter; never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub u64);

impl CommandId {
    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// BrowsingContextId
// ============================================================================

/// Identifier for one browser tab/window (browsing context).
///
/// Opaque string assigned by the remote end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowsingContextId(String);

impl BrowsingContextId {
    /// Wraps a raw context id string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrowsingContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BrowsingContextId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BrowsingContextId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// NetworkId
// ============================================================================

/// Identifier for one HTTP request/response exchange.
///
/// Assigned by the remote end; unique within a browsing context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    /// Wraps a raw network id string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NetworkId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// InterceptId
// ============================================================================

/// Server-assigned identifier for a registered network intercept rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterceptId(String);

impl InterceptId {
    /// Wraps a raw intercept id string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterceptId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Handle identifying one registered event listener.
///
/// Returned by [`EventManager::on`](crate::client::EventManager::on) and
/// required to unregister that listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_ordering() {
        assert!(CommandId(1) < CommandId(2));
        assert_eq!(CommandId(7).value(), 7);
    }

    #[test]
    fn test_command_id_serde_transparent() {
        let json = serde_json::to_string(&CommandId(42)).expect("serialize");
        assert_eq!(json, "42");
    }

    #[test]
    fn test_string_ids_round_trip() {
        let ctx = BrowsingContextId::new("ctx-1");
        assert_eq!(ctx.as_str(), "ctx-1");
        assert_eq!(ctx.to_string(), "ctx-1");

        let net: NetworkId = "req-9".into();
        let json = serde_json::to_string(&net).expect("serialize");
        assert_eq!(json, "\"req-9\"");

        let back: NetworkId = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, net);
    }
}
