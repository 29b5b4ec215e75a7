//! Wire frame types.
//!
//! One JSON message on the socket is a *frame*. Outbound frames are
//! commands (`{id, method, params}`). Inbound frames are either command
//! responses (`{id, result}` / `{id, error}`) or protocol events
//! (`{method, params}`, no `id`). The two inbound shapes are disambiguated
//! by the presence of `method`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::Command;

// ============================================================================
// CommandFrame
// ============================================================================

/// Outbound command envelope.
///
/// # Format
///
/// ```json
/// { "id": 7, "method": "session.subscribe", "params": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandFrame {
    /// Identifier for request/response correlation.
    pub id: CommandId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl CommandFrame {
    /// Wraps a command in an envelope with the given id.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, command: Command) -> Self {
        Self { id, command }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Classified inbound frame.
///
/// Frames carrying a `method` are protocol events; frames without one are
/// command responses and are routed to the pending-response registry.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Command response (or any frame without a `method`).
    Response(Value),

    /// Protocol event, keyed by its method name.
    Event {
        /// Event method in `module.eventName` format.
        method: String,
        /// The full frame object.
        frame: Value,
    },
}

impl Frame {
    /// Parses and classifies a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not valid JSON.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Classifies an already-parsed frame on the presence of `method`.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value.get("method").and_then(Value::as_str) {
            Some(method) => Self::Event {
                method: method.to_owned(),
                frame: value,
            },
            None => Self::Response(value),
        }
    }
}

// ============================================================================
// ResponseFrame
// ============================================================================

/// Typed view of a command response.
///
/// # Format
///
/// Success: `{"id": 7, "type": "success", "result": {...}}`
/// Error: `{"id": 7, "type": "error", "error": "...", "message": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Matches the command `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error payload (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Human-readable error message (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseFrame {
    /// Returns `true` if this response carries an error envelope.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, consuming the response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandError`] carrying the server payload if the
    /// response was an error.
    pub fn into_result(self) -> Result<Value> {
        if self.is_error() {
            let id = self.id;
            let payload = serde_json::to_value(&self).unwrap_or(Value::Null);
            return Err(Error::command_error(id, payload));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }

    /// Gets a string value from the result.
    ///
    /// Returns an empty string if the key is missing or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::SessionCommand;

    #[test]
    fn test_command_frame_serialization() {
        let frame = CommandFrame::new(
            CommandId(3),
            Command::Session(SessionCommand::Subscribe {
                events: vec!["network".into()],
                contexts: None,
            }),
        );

        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(value["id"], 3);
        assert_eq!(value["method"], "session.subscribe");
        assert_eq!(value["params"]["events"], json!(["network"]));
    }

    #[test]
    fn test_frame_classification() {
        let event = Frame::parse(r#"{"method": "network.responseStarted", "params": {}}"#)
            .expect("parse event");
        assert!(matches!(event, Frame::Event { ref method, .. } if method == "network.responseStarted"));

        let response = Frame::parse(r#"{"id": 1, "result": {}}"#).expect("parse response");
        assert!(matches!(response, Frame::Response(_)));
    }

    #[test]
    fn test_frame_parse_rejects_invalid_json() {
        assert!(Frame::parse("{not json").is_err());
    }

    #[test]
    fn test_response_frame_success() {
        let response: ResponseFrame =
            serde_json::from_value(json!({"id": 4, "result": {"context": "ctx-1"}}))
                .expect("parse");

        assert!(!response.is_error());
        assert_eq!(response.get_string("context"), "ctx-1");
        let result = response.into_result().expect("success");
        assert_eq!(result["context"], "ctx-1");
    }

    #[test]
    fn test_response_frame_error() {
        let response: ResponseFrame = serde_json::from_value(
            json!({"id": 4, "error": "unknown command", "message": "no such method"}),
        )
        .expect("parse");

        assert!(response.is_error());
        let err = response.into_result().unwrap_err();
        assert!(err.is_command_error());
    }
}
