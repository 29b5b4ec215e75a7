//! Request interception capability interface.
//!
//! An interceptor declares which lifecycle [`InterceptPhase`]s it pauses
//! traffic in, for which context and URL patterns, and reacts to the
//! intercepted frames. Registration is driven by
//! [`Client::register_interceptor`](crate::client::Client::register_interceptor):
//! it sends `network.addIntercept`, stores the server-assigned intercept id
//! on the interceptor, and subscribes its `handle_event` under each
//! declared event name.
//!
//! Several interceptors share the same event stream and each receives
//! every frame, so every implementation must filter with
//! [`is_addressed`](Interceptor::is_addressed) before acting.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, InterceptId};
use crate::protocol::{InterceptPhase, UrlPattern};

// ============================================================================
// Interceptor
// ============================================================================

/// Capability interface for request interception.
///
/// Implementations hold a command handle
/// ([`CommandManager`](crate::client::CommandManager)) to issue their
/// continue commands; they share the client's transport but never own the
/// client.
pub trait Interceptor: Send + Sync {
    /// Lifecycle phases this interceptor pauses traffic in.
    fn phases(&self) -> &[InterceptPhase];

    /// Browsing context this interceptor is scoped to.
    fn context(&self) -> &BrowsingContextId;

    /// URL patterns the intercept rule matches.
    fn url_patterns(&self) -> Vec<UrlPattern>;

    /// Server-assigned intercept id, once registered.
    fn intercept_id(&self) -> Option<InterceptId>;

    /// Stores the server-assigned intercept id on registration.
    fn set_intercept_id(&self, id: InterceptId);

    /// Reacts to one intercepted frame.
    ///
    /// Runs on the dispatch path. Errors propagate to the dispatch caller
    /// rather than being swallowed; a supervising layer decides whether
    /// they are fatal to the session.
    fn handle_event(&self, frame: &Value) -> Result<()>;

    /// Event method names delivered for the declared phases.
    fn events(&self) -> Vec<String> {
        self.phases()
            .iter()
            .map(|phase| phase.event_method().to_string())
            .collect()
    }

    /// Returns `true` if `frame` is addressed to this interceptor.
    ///
    /// The frame must be blocked (`isBlocked: true`) and list this
    /// interceptor's own id in `intercepts`. Both checks are mandatory:
    /// the event stream is shared and unblocked frames are informational.
    fn is_addressed(&self, frame: &Value) -> bool {
        let Some(own_id) = self.intercept_id() else {
            return false;
        };
        let params = match frame.get("params") {
            Some(params) => params,
            None => return false,
        };

        if params.get("isBlocked").and_then(Value::as_bool) != Some(true) {
            return false;
        }

        params
            .get("intercepts")
            .and_then(Value::as_array)
            .is_some_and(|intercepts| {
                intercepts
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|id| id == own_id.as_str())
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
