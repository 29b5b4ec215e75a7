//! Sensitive-value redaction for outbound frame logging.
//!
//! Commands can carry credentials (cookie values, auth headers, login
//! parameters). Before a frame is logged, every value stored under a
//! sensitive key is replaced, recursively, at any nesting depth through
//! objects and arrays. The frame put on the wire is never modified.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Keys whose values are redacted, compared case-insensitively.
const SENSITIVE_KEYS: [&str; 5] = ["value", "token", "password", "authorization", "username"];

/// Replacement text for redacted values.
const REDACTED: &str = "[redacted]";

// ============================================================================
// Redaction
// ============================================================================

/// Returns a copy of `value` with all sensitive values replaced.
///
/// A value is sensitive when its key matches one of [`SENSITIVE_KEYS`]
/// case-insensitively. The whole value under such a key is replaced, even
/// if it is itself an object or array.
#[must_use]
pub fn redacted(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String(REDACTED.into()))
                    } else {
                        (key.clone(), redacted(val))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

/// Returns `true` if values under this key must be redacted.
#[inline]
fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|candidate| key.eq_ignore_ascii_case(candidate))
}

// ============================================================================
// Tests
// ============================================================================
