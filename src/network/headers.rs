//! Header-injection interceptor.
//!
//! Pauses matching requests in the `beforeRequestSent` phase and resumes
//! them with a configured set of extra headers, e.g. an API key the
//! rendered page needs for its asset requests.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::CommandManager;
use crate::error::Result;
use crate::identifiers::{BrowsingContextId, InterceptId, NetworkId};
use crate::network::Interceptor;
use crate::protocol::{Command, Header, InterceptPhase, NetworkCommand, UrlPattern};

// ============================================================================
// AddHeadersInterceptor
// ============================================================================

/// Injects configured headers into every matching request.
///
/// Headers are normalized to the protocol's
/// `{name, value: {type: "string", value}}` shape at construction via
/// [`Header::new`].
pub struct AddHeadersInterceptor {
    /// Command handle sharing the client's transport.
    commands: Arc<CommandManager>,
    /// Context this interceptor is scoped to.
    context: BrowsingContextId,
    /// URL patterns the intercept rule matches.
    url_patterns: Vec<UrlPattern>,
    /// Headers to inject.
    headers: Vec<Header>,
    /// Server-assigned intercept id, set on registration.
    intercept_id: Mutex<Option<InterceptId>>,
}

/// The single phase this interceptor pauses traffic in.
const PHASES: [InterceptPhase; 1] = [InterceptPhase::BeforeRequestSent];

impl AddHeadersInterceptor {
    /// Creates a header-injection interceptor.
    #[must_use]
    pub fn new(
        commands: Arc<CommandManager>,
        context: impl Into<BrowsingContextId>,
        url_patterns: Vec<UrlPattern>,
        headers: Vec<Header>,
    ) -> Self {
        Self {
            commands,
            context: context.into(),
            url_patterns,
            headers,
            intercept_id: Mutex::new(None),
        }
    }
}

impl Interceptor for AddHeadersInterceptor {
    fn phases(&self) -> &[InterceptPhase] {
        &PHASES
    }

    fn context(&self) -> &BrowsingContextId {
        &self.context
    }

    fn url_patterns(&self) -> Vec<UrlPattern> {
        self.url_patterns.clone()
    }

    fn intercept_id(&self) -> Option<InterceptId> {
        self.intercept_id.lock().clone()
    }

    fn set_intercept_id(&self, id: InterceptId) {
        *self.intercept_id.lock() = Some(id);
    }

    fn handle_event(&self, frame: &Value) -> Result<()> {
        if !self.is_addressed(frame) {
            return Ok(());
        }

        let Some(request) = frame
            .pointer("/params/request/request")
            .and_then(Value::as_str)
            .map(NetworkId::new)
        else {
            warn!("Blocked frame without request id");
            return Ok(());
        };

        debug!(request = %request, headers = self.headers.len(), "Continuing request with injected headers");
        self.commands.send_cmd(
            Command::Network(NetworkCommand::ContinueRequest {
                request,
                headers: Some(self.headers.clone()),
            }),
            false,
        )?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
