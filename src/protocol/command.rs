//! Command definitions organized by protocol module.
//!
//! Commands follow the BiDi `module.methodName` format and serialize to
//! `{"method": ..., "params": {...}}`. All command types derive
//! `PartialEq`: two commands are equal when method and params match,
//! independent of the id the transport later assigns.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `session` | `subscribe`, `status`, `end` |
//! | `browsingContext` | `create`, `navigate`, `close`, `print` |
//! | `network` | `addIntercept`, `continueRequest`, `continueWithAuth` |
//! | `storage` | `setCookie` |
//! | `script` | `evaluate` |
//! | `browser` | user context management, `close` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::{BrowsingContextId, NetworkId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Session module commands.
    Session(SessionCommand),
    /// BrowsingContext module commands.
    BrowsingContext(BrowsingContextCommand),
    /// Network module commands.
    Network(NetworkCommand),
    /// Storage module commands.
    Storage(StorageCommand),
    /// Script module commands.
    Script(ScriptCommand),
    /// Browser module commands.
    Browser(BrowserCommand),
    /// Escape hatch for commands not yet typed.
    Raw(RawCommand),
}

impl Command {
    /// Creates a raw command from a method name and params object.
    #[inline]
    #[must_use]
    pub fn raw(method: impl Into<String>, params: Value) -> Self {
        Self::Raw(RawCommand {
            method: method.into(),
            params,
        })
    }
}

// ============================================================================
// RawCommand
// ============================================================================

/// Untyped `{method, params}` command.
///
/// Used by tests and for protocol methods without a typed variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    /// Method in `module.methodName` format.
    pub method: String,
    /// Command parameters.
    pub params: Value,
}

// ============================================================================
// Session Commands
// ============================================================================

/// Session module commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum SessionCommand {
    /// Enable delivery of the named event families.
    #[serde(rename = "session.subscribe")]
    Subscribe {
        /// Event names or family prefixes to subscribe to.
        events: Vec<String>,
        /// Restrict the subscription to these contexts (all if `None`).
        #[serde(skip_serializing_if = "Option::is_none")]
        contexts: Option<Vec<BrowsingContextId>>,
    },

    /// Query remote readiness.
    #[serde(rename = "session.status")]
    Status {},

    /// End the session.
    #[serde(rename = "session.end")]
    End {},
}

// ============================================================================
// BrowsingContext Commands
// ============================================================================

/// BrowsingContext module commands for tab lifecycle and printing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowsingContextCommand {
    /// Create a new browsing context (tab or window).
    #[serde(rename = "browsingContext.create")]
    Create {
        /// Context type to create.
        #[serde(rename = "type")]
        kind: ContextKind,
        /// User context (container) to create it in.
        #[serde(rename = "userContext", skip_serializing_if = "Option::is_none")]
        user_context: Option<String>,
    },

    /// Navigate a context to a URL.
    #[serde(rename = "browsingContext.navigate")]
    Navigate {
        /// Target context.
        context: BrowsingContextId,
        /// URL to navigate to.
        url: String,
        /// Readiness state to wait for before responding.
        #[serde(skip_serializing_if = "Option::is_none")]
        wait: Option<ReadinessState>,
    },

    /// Close a browsing context.
    #[serde(rename = "browsingContext.close")]
    Close {
        /// Context to close.
        context: BrowsingContextId,
    },

    /// Render a context to PDF.
    ///
    /// Print options are validated by an external collaborator and carried
    /// here as an opaque object.
    #[serde(rename = "browsingContext.print")]
    Print {
        /// Context to print.
        context: BrowsingContextId,
        /// Print parameters (margins, orientation, scale, ...).
        #[serde(flatten)]
        options: Map<String, Value>,
    },
}

/// Browsing context type for `browsingContext.create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// A browser tab.
    Tab,
    /// A top-level window.
    Window,
}

/// Navigation readiness state for `browsingContext.navigate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Return as soon as navigation is initiated.
    None,
    /// Wait for the `DOMContentLoaded` event.
    Interactive,
    /// Wait for the `load` event.
    Complete,
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network module commands for interception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Register an intercept rule by phase and URL pattern.
    #[serde(rename = "network.addIntercept")]
    AddIntercept {
        /// Lifecycle phases at which to pause matching traffic.
        phases: Vec<InterceptPhase>,
        /// Contexts the rule applies to (all if `None`).
        #[serde(skip_serializing_if = "Option::is_none")]
        contexts: Option<Vec<BrowsingContextId>>,
        /// URL patterns the rule matches.
        #[serde(rename = "urlPatterns", skip_serializing_if = "Option::is_none")]
        url_patterns: Option<Vec<UrlPattern>>,
    },

    /// Resume a request paused in the `beforeRequestSent` phase.
    #[serde(rename = "network.continueRequest")]
    ContinueRequest {
        /// Paused request id.
        request: NetworkId,
        /// Replacement request headers.
        #[serde(skip_serializing_if = "Option::is_none")]
        headers: Option<Vec<Header>>,
    },

    /// Answer an authentication challenge in the `authRequired` phase.
    #[serde(rename = "network.continueWithAuth")]
    ContinueWithAuth {
        /// Paused request id.
        request: NetworkId,
        /// What to do with the challenge.
        #[serde(flatten)]
        action: ContinueWithAuthAction,
    },
}

/// Point in a request's lifecycle at which interception occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterceptPhase {
    /// Before the request is sent.
    #[serde(rename = "beforeRequestSent")]
    BeforeRequestSent,
    /// After response headers arrive.
    #[serde(rename = "responseStarted")]
    ResponseStarted,
    /// When the server issues an authentication challenge.
    #[serde(rename = "authRequired")]
    AuthRequired,
}

impl InterceptPhase {
    /// Returns the event method delivered for traffic paused in this phase.
    #[inline]
    #[must_use]
    pub fn event_method(self) -> &'static str {
        match self {
            Self::BeforeRequestSent => "network.beforeRequestSent",
            Self::ResponseStarted => "network.responseStarted",
            Self::AuthRequired => "network.authRequired",
        }
    }
}

/// Decision for `network.continueWithAuth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ContinueWithAuthAction {
    /// Supply credentials for the challenge.
    #[serde(rename = "provideCredentials")]
    ProvideCredentials {
        /// Credentials to present.
        credentials: AuthCredentials,
    },
    /// Cancel the challenge (the request fails with an auth error).
    #[serde(rename = "cancel")]
    Cancel,
}

/// Password credentials for `provideCredentials`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthCredentials {
    /// Username/password pair.
    Password {
        /// Username to present.
        username: String,
        /// Password to present.
        password: String,
    },
}

impl AuthCredentials {
    /// Creates password credentials.
    #[inline]
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// URL pattern for intercept rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UrlPattern {
    /// Literal URL pattern string.
    String {
        /// The pattern text.
        pattern: String,
    },
}

impl UrlPattern {
    /// Creates a literal string pattern.
    #[inline]
    #[must_use]
    pub fn string(pattern: impl Into<String>) -> Self {
        Self::String {
            pattern: pattern.into(),
        }
    }
}

/// One HTTP header for `continueRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: BytesValue,
}

impl Header {
    /// Creates a header with a string value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: BytesValue::string(value),
        }
    }
}

/// BiDi `network.BytesValue`: a tagged string payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BytesValue {
    /// UTF-8 string payload.
    String {
        /// The payload text.
        value: String,
    },
}

impl BytesValue {
    /// Creates a string payload.
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
        }
    }
}

// ============================================================================
// Storage Commands
// ============================================================================

/// Storage module commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum StorageCommand {
    /// Set a cookie.
    #[serde(rename = "storage.setCookie")]
    SetCookie {
        /// Cookie to set.
        cookie: CookieParams,
        /// Storage partition descriptor.
        #[serde(skip_serializing_if = "Option::is_none")]
        partition: Option<Value>,
    },
}

/// Cookie parameters for `storage.setCookie`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieParams {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: BytesValue,
    /// Cookie domain.
    pub domain: String,
    /// Cookie path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Secure flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// HttpOnly flag.
    #[serde(rename = "httpOnly", skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Expiry as a Unix timestamp in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl CookieParams {
    /// Creates a cookie with name, string value and domain.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: BytesValue::string(value),
            domain: domain.into(),
            path: None,
            secure: None,
            http_only: None,
            expiry: None,
        }
    }
}

// ============================================================================
// Script Commands
// ============================================================================

/// Script module commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptCommand {
    /// Evaluate a script expression in a context.
    #[serde(rename = "script.evaluate")]
    Evaluate {
        /// JavaScript expression.
        expression: String,
        /// Realm/context to evaluate in.
        target: EvaluateTarget,
        /// Whether to await a returned promise.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
    },
}

/// Evaluation target: a browsing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateTarget {
    /// Context to evaluate in.
    pub context: BrowsingContextId,
}

// ============================================================================
// Browser Commands
// ============================================================================

/// Browser module commands for user contexts and shutdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowserCommand {
    /// Create an isolated user context (container).
    #[serde(rename = "browser.createUserContext")]
    CreateUserContext {},

    /// List user contexts.
    #[serde(rename = "browser.getUserContexts")]
    GetUserContexts {},

    /// Remove a user context.
    #[serde(rename = "browser.removeUserContext")]
    RemoveUserContext {
        /// User context to remove.
        #[serde(rename = "userContext")]
        user_context: String,
    },

    /// Close the browser.
    #[serde(rename = "browser.close")]
    Close {},
}

// ============================================================================
// Tests
// ============================================================================
