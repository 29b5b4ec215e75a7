//! HTTP authentication interceptor.
//!
//! Answers `authRequired` challenges with configured credentials, once
//! per request. A server that rejects the credentials re-issues the
//! challenge with the same network id; responding with credentials again
//! would loop forever, so the second interception of an id cancels the
//! challenge instead.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::CommandManager;
use crate::error::Result;
use crate::identifiers::{BrowsingContextId, InterceptId, NetworkId};
use crate::network::Interceptor;
use crate::protocol::{
    AuthCredentials, Command, ContinueWithAuthAction, InterceptPhase, NetworkCommand, UrlPattern,
};

// ============================================================================
// AuthInterceptor
// ============================================================================

/// Supplies credentials for authentication challenges, at most once per
/// request.
pub struct AuthInterceptor {
    /// Command handle sharing the client's transport.
    commands: Arc<CommandManager>,
    /// Context this interceptor is scoped to.
    context: BrowsingContextId,
    /// URL patterns the intercept rule matches.
    url_patterns: Vec<UrlPattern>,
    /// Username to present.
    username: String,
    /// Password to present.
    password: String,
    /// Network ids credentials were already supplied for. A repeat
    /// interception of a member means the server rejected them.
    attempted: Mutex<FxHashSet<NetworkId>>,
    /// Server-assigned intercept id, set on registration.
    intercept_id: Mutex<Option<InterceptId>>,
}

/// The single phase this interceptor pauses traffic in.
const PHASES: [InterceptPhase; 1] = [InterceptPhase::AuthRequired];

impl AuthInterceptor {
    /// Creates an auth interceptor with the given credentials.
    #[must_use]
    pub fn new(
        commands: Arc<CommandManager>,
        context: impl Into<BrowsingContextId>,
        url_patterns: Vec<UrlPattern>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            commands,
            context: context.into(),
            url_patterns,
            username: username.into(),
            password: password.into(),
            attempted: Mutex::new(FxHashSet::default()),
            intercept_id: Mutex::new(None),
        }
    }

    /// Decides one intercepted auth challenge.
    ///
    /// First interception of `network_id`: remember it and answer the
    /// challenge with the configured credentials. Repeat interception:
    /// the credentials were rejected, so forget the id and cancel,
    /// breaking the retry loop.
    pub fn process_interception(
        &self,
        _event: &Value,
        navigation_id: Option<&str>,
        network_id: NetworkId,
        url: &str,
    ) -> Result<()> {
        let already_attempted = {
            let mut attempted = self.attempted.lock();
            if attempted.contains(&network_id) {
                attempted.remove(&network_id);
                true
            } else {
                attempted.insert(network_id.clone());
                false
            }
        };

        let action = if already_attempted {
            warn!(
                request = %network_id,
                navigation = ?navigation_id,
                url,
                "Credentials rejected, cancelling auth challenge"
            );
            ContinueWithAuthAction::Cancel
        } else {
            debug!(
                request = %network_id,
                navigation = ?navigation_id,
                url,
                "Providing credentials for auth challenge"
            );
            ContinueWithAuthAction::ProvideCredentials {
                credentials: AuthCredentials::basic(&self.username, &self.password),
            }
        };

        self.commands.send_cmd(
            Command::Network(NetworkCommand::ContinueWithAuth {
                request: network_id,
                action,
            }),
            false,
        )?;
        Ok(())
    }

    /// Returns `true` if credentials are currently outstanding for `id`.
    #[must_use]
    pub fn has_attempted(&self, id: &NetworkId) -> bool {
        self.attempted.lock().contains(id)
    }
}

impl Interceptor for AuthInterceptor {
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

        let params = frame.get("params").unwrap_or(&Value::Null);
        let Some(network_id) = params
            .pointer("/request/request")
            .and_then(Value::as_str)
            .map(NetworkId::new)
        else {
            warn!("Blocked auth frame without request id");
            return Ok(());
        };

        let navigation_id = params.get("navigation").and_then(Value::as_str);
        let url = params
            .pointer("/request/url")
            .and_then(Value::as_str)
            .unwrap_or_default();

        // Runs on the dispatch path; failures must reach the reader task.
        self.process_interception(frame, navigation_id, network_id.clone(), url)
            .inspect_err(|e| {
                error!(
                    request = %network_id,
                    navigation = ?navigation_id,
                    url,
                    error = %e,
                    "Auth interception failed"
                );
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::sync::mpsc;

    fn interceptor_with_sink() -> (AuthInterceptor, mpsc::UnboundedReceiver<String>) {
        let commands = Arc::new(CommandManager::new());
        let (tx, rx) = mpsc::unbounded_channel();
        commands.install_sink(tx);

        let interceptor = AuthInterceptor::new(commands, "ctx-1", vec![], "user", "hunter2");
        interceptor.set_intercept_id(InterceptId::new("icpt-auth"));
        (interceptor, rx)
    }

    fn auth_frame(network_id: &str) -> Value {
        json!({
            "method": "network.authRequired",
            "params": {
                "isBlocked": true,
                "intercepts": ["icpt-auth"],
                "navigation": "nav-1",
                "context": "ctx-1",
                "request": {"request": network_id, "url": "https://example.com/secure"}
            }
        })
    }

    async fn next_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> Value {
        let sent = rx.recv().await.expect("outbound frame");
        serde_json::from_str(&sent).expect("valid json")
    }

    #[tokio::test]
    async fn test_first_challenge_provides_credentials() {
        let (interceptor, mut rx) = interceptor_with_sink();

        interceptor.handle_event(&auth_frame("n1")).expect("handle");

        let frame = next_frame(&mut rx).await;
        assert_eq!(frame["method"], "network.continueWithAuth");
        assert_eq!(frame["params"]["request"], "n1");
        assert_eq!(frame["params"]["action"], "provideCredentials");
        assert_eq!(
            frame["params"]["credentials"],
            json!({"type": "password", "username": "user", "password": "hunter2"})
        );
        assert!(interceptor.has_attempted(&"n1".into()));
    }

    #[tokio::test]
    async fn test_repeat_challenge_cancels_and_clears() {
        let (interceptor, mut rx) = interceptor_with_sink();

        interceptor.handle_event(&auth_frame("n1")).expect("handle");
        let _ = next_frame(&mut rx).await;

        interceptor.handle_event(&auth_frame("n1")).expect("handle");
        let frame = next_frame(&mut rx).await;

        assert_eq!(frame["params"]["action"], "cancel");
        assert!(frame["params"].get("credentials").is_none());
        assert!(
            !interceptor.has_attempted(&"n1".into()),
            "id cleared so a later challenge starts fresh"
        );
    }

    #[tokio::test]
    async fn test_independent_requests_each_get_credentials() {
        let (interceptor, mut rx) = interceptor_with_sink();

        interceptor.handle_event(&auth_frame("n1")).expect("handle");
        interceptor.handle_event(&auth_frame("n2")).expect("handle");

        assert_eq!(next_frame(&mut rx).await["params"]["action"], "provideCredentials");
        assert_eq!(next_frame(&mut rx).await["params"]["action"], "provideCredentials");
    }

    #[tokio::test]
    async fn test_unaddressed_frame_ignored() {
        let (interceptor, mut rx) = interceptor_with_sink();

        let mut frame = auth_frame("n1");
        frame["params"]["intercepts"] = json!(["icpt-other"]);
        interceptor.handle_event(&frame).expect("handle");

        let mut frame = auth_frame("n1");
        frame["params"]["isBlocked"] = json!(false);
        interceptor.handle_event(&frame).expect("handle");

        assert!(rx.try_recv().is_err(), "no command must be issued");
        assert!(!interceptor.has_attempted(&"n1".into()));
    }

    #[tokio::test]
    async fn test_send_failure_propagates() {
        let commands = Arc::new(CommandManager::new());
        // No sink installed: the continue command cannot be sent.
        let interceptor = AuthInterceptor::new(commands, "ctx-1", vec![], "user", "hunter2");
        interceptor.set_intercept_id(InterceptId::new("icpt-auth"));

        let err = interceptor.handle_event(&auth_frame("n1")).unwrap_err();
        assert!(matches!(err, crate::error::Error::NotStarted));
    }
}
