//! Client facade composing connection state, command correlation and
//! event dispatch over one WebSocket transport.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::commands::CommandManager;
use crate::client::connection::ConnectionState;
use crate::client::dispatcher::WebSocketDispatcher;
use crate::client::events::EventHandler;
use crate::error::{Error, Result};
use crate::identifiers::{CommandId, InterceptId, ListenerId};
use crate::network::Interceptor;
use crate::protocol::{Command, NetworkCommand, ResponseFrame, SessionCommand};
use crate::transport::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Client
// ============================================================================

/// BiDi protocol client over one WebSocket connection.
///
/// The client exclusively owns its connection state, command manager and
/// dispatcher for its lifetime. It is cheap to clone; clones share the
/// same session.
///
/// # Example
///
/// ```ignore
/// use bidi_client::Client;
///
/// let client = Client::new("ws://127.0.0.1:9222/session");
/// client.start().await?;
/// client.wait_until_open(Duration::from_secs(10)).await?;
/// let status = client.session_status().await?;
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// WebSocket endpoint, opaque input from session establishment.
    ws_url: String,
    /// Set once `start` succeeds; gates command sending.
    started: AtomicBool,
    /// Socket-open latch.
    connection: ConnectionState,
    /// Command id allocation and response correlation.
    commands: Arc<CommandManager>,
    /// Inbound frame demultiplexer.
    dispatcher: Arc<WebSocketDispatcher>,
    /// Open transport, present between `start` and `close`.
    transport: Mutex<Option<Transport>>,
}

impl Client {
    /// Creates a client for the given WebSocket URL.
    ///
    /// Nothing is connected until [`start`](Self::start).
    #[must_use]
    pub fn new(ws_url: impl Into<String>) -> Self {
        let connection = ConnectionState::new();
        let commands = Arc::new(CommandManager::new());
        let dispatcher = Arc::new(WebSocketDispatcher::new());

        Self::wire(&connection, &commands, &dispatcher);

        Self {
            inner: Arc::new(ClientInner {
                ws_url: ws_url.into(),
                started: AtomicBool::new(false),
                connection,
                commands,
                dispatcher,
                transport: Mutex::new(None),
            }),
        }
    }

    /// Wires dispatcher callbacks into connection state and command
    /// correlation. Done once, at construction, so repeated `start`
    /// attempts never double-register.
    fn wire(
        connection: &ConnectionState,
        commands: &Arc<CommandManager>,
        dispatcher: &Arc<WebSocketDispatcher>,
    ) {
        let open_state = connection.clone();
        dispatcher.on_open(Arc::new(move |_frame| {
            open_state.mark_connected();
            Ok(())
        }));

        let correlator = Arc::clone(commands);
        dispatcher.on_message(Arc::new(move |frame| {
            if !correlator.handle_response(frame) {
                if frame.get("error").is_some() {
                    error!(%frame, "Error frame with no matching waiter");
                } else {
                    warn!(%frame, "Unsolicited response frame");
                }
            }
            Ok(())
        }));
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Opens the transport and starts the session.
    ///
    /// Idempotent: a second call on a started client is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates transport handshake errors; the client stays unstarted
    /// on failure and `start` may be retried.
    pub async fn start(&self) -> Result<()> {
        // Claim the flag first; concurrent starts open one transport at
        // most, the losers return immediately.
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Client already started");
            return Ok(());
        }

        let transport =
            match Transport::open(&self.inner.ws_url, Arc::clone(&self.inner.dispatcher)).await {
                Ok(transport) => transport,
                Err(e) => {
                    self.inner.started.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            };
        self.inner.commands.install_sink(transport.outbound_sink());
        *self.inner.transport.lock() = Some(transport);

        info!(url = %self.inner.ws_url, "Client started");
        Ok(())
    }

    /// Returns `true` between a successful `start` and `close`.
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Blocks until the socket is observed open or `wait` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`] on expiry.
    pub async fn wait_until_open(&self, wait: Duration) -> Result<()> {
        self.inner.connection.wait_until_open(wait).await
    }

    /// Tears down the transport and resets the started flag.
    ///
    /// All pending commands fail with `ConnectionClosed`. Local event
    /// listeners stay registered; remote subscriptions are not undone.
    pub fn close(&self) {
        if let Some(transport) = self.inner.transport.lock().take() {
            transport.close();
        }
        self.inner.commands.clear_sink();
        self.inner.commands.fail_pending();
        self.inner.started.store(false, Ordering::SeqCst);
        info!("Client closed");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a command without waiting for its response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] before [`start`](Self::start).
    pub fn send_cmd(&self, command: Command) -> Result<CommandId> {
        self.ensure_started()?;
        self.inner.commands.send_cmd(command, false)
    }

    /// Sends a command and waits up to `wait` for its response frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] before [`start`](Self::start)
    /// - [`Error::CommandTimeout`] if no response arrives in time
    /// - [`Error::CommandError`] if the server answers with an error
    pub async fn send_cmd_and_wait(&self, command: Command, wait: Duration) -> Result<Value> {
        self.ensure_started()?;
        self.inner.commands.send_cmd_and_wait(command, wait).await
    }

    /// Queries remote readiness via `session.status`.
    pub async fn session_status(&self) -> Result<Value> {
        self.send_cmd_and_wait(
            Command::Session(SessionCommand::Status {}),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await
    }

    /// Ends the session via `session.end`.
    pub async fn end_session(&self) -> Result<Value> {
        self.send_cmd_and_wait(
            Command::Session(SessionCommand::End {}),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers `handler` for each event name and subscribes remotely.
    ///
    /// Subscribing a local listener has the remote side effect of enabling
    /// delivery of those event families: a `session.subscribe` command is
    /// issued for the given names. Family prefixes (`"network"`) are valid
    /// names.
    ///
    /// # Errors
    ///
    /// Propagates the `session.subscribe` command failure; local
    /// registrations are kept either way (events may already be flowing
    /// from an earlier subscription).
    pub async fn on_event(&self, names: &[&str], handler: EventHandler) -> Result<Vec<ListenerId>> {
        let ids: Vec<ListenerId> = names
            .iter()
            .map(|name| self.inner.dispatcher.on_event(*name, Arc::clone(&handler)))
            .collect();

        if !names.is_empty() {
            self.send_cmd_and_wait(
                Command::Session(SessionCommand::Subscribe {
                    events: names.iter().map(|s| (*s).to_string()).collect(),
                    contexts: None,
                }),
                DEFAULT_COMMAND_TIMEOUT,
            )
            .await?;
        }

        Ok(ids)
    }

    /// Removes a local event listener.
    ///
    /// Does **not** unsubscribe remotely; the event family keeps arriving
    /// and re-subscription policy stays with the caller.
    pub fn remove_event_listener(&self, name: &str, id: ListenerId) -> bool {
        self.inner.dispatcher.remove_event_listener(name, id)
    }

    // ========================================================================
    // Interception
    // ========================================================================

    /// Registers an interceptor: sends `network.addIntercept`, stores the
    /// server-assigned intercept id on the interceptor, and subscribes its
    /// `handle_event` under each declared event name.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the interceptor declares no phases
    /// - [`Error::Protocol`] if the server result carries no intercept id
    /// - plus any command failure
    pub async fn register_interceptor(
        &self,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<InterceptId> {
        let phases = interceptor.phases().to_vec();
        if phases.is_empty() {
            return Err(Error::invalid_argument(
                "interceptor must declare at least one phase",
            ));
        }

        // An empty pattern list is omitted from the wire frame, not sent
        // as [].
        let patterns = interceptor.url_patterns();
        let frame = self
            .send_cmd_and_wait(
                Command::Network(NetworkCommand::AddIntercept {
                    phases,
                    contexts: Some(vec![interceptor.context().clone()]),
                    url_patterns: (!patterns.is_empty()).then_some(patterns),
                }),
                DEFAULT_COMMAND_TIMEOUT,
            )
            .await?;

        let response: ResponseFrame = serde_json::from_value(frame)?;
        let result = response.into_result()?;
        let intercept = result
            .get("intercept")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("addIntercept result carried no intercept id"))?;

        let intercept_id = InterceptId::new(intercept);
        interceptor.set_intercept_id(intercept_id.clone());
        debug!(intercept = %intercept_id, "Interceptor registered");

        let events = interceptor.events();
        let subject = Arc::clone(&interceptor);
        self.on_event(
            &events.iter().map(String::as_str).collect::<Vec<_>>(),
            Arc::new(move |frame| subject.handle_event(frame)),
        )
        .await?;

        Ok(intercept_id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Returns a handle to the command manager.
    ///
    /// Interceptors issue their continue commands through this handle; it
    /// shares the client's transport without owning the client.
    #[must_use]
    pub fn command_manager(&self) -> Arc<CommandManager> {
        Arc::clone(&self.inner.commands)
    }

    /// Returns a handle to the frame dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<WebSocketDispatcher> {
        Arc::clone(&self.inner.dispatcher)
    }

    fn ensure_started(&self) -> Result<()> {
        if self.is_started() {
            Ok(())
        } else {
            Err(Error::NotStarted)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
