//! WebSocket transport: connection, reader and writer tasks.
//!
//! The transport owns the socket I/O loop. Outbound frames arrive through
//! an unbounded channel (so senders never block); inbound frames are
//! handed to the [`WebSocketDispatcher`] on the reader path. Socket
//! lifecycle transitions (`open`, `close`, `error`) are surfaced as
//! socket-level events through the same dispatcher.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::client::WebSocketDispatcher;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the WebSocket connection handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Transport
// ============================================================================

/// An open WebSocket connection with its reader and writer tasks.
///
/// Dropping the transport does not close the socket; call
/// [`close`](Self::close) explicitly (the owning client does this).
#[derive(Debug)]
pub struct Transport {
    /// Outbound text frame channel into the writer half.
    outbound: mpsc::UnboundedSender<String>,
    /// One-shot shutdown signal for the I/O loop.
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Transport {
    /// Connects to a `ws`/`wss` endpoint and spawns the I/O loop.
    ///
    /// The endpoint string is treated as opaque input from the
    /// session-establishment collaborator; only its scheme is validated.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a malformed or non-WebSocket URL
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds 30s
    /// - [`Error::WebSocket`] for handshake failures
    pub async fn open(ws_url: &str, dispatcher: Arc<WebSocketDispatcher>) -> Result<Self> {
        let url = Url::parse(ws_url)
            .map_err(|e| Error::invalid_argument(format!("invalid WebSocket URL: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::invalid_argument(format!(
                "expected ws:// or wss:// URL, got scheme {:?}",
                url.scheme()
            )));
        }

        debug!(url = %url, "Opening WebSocket connection");
        let (ws_stream, _) = timeout(CONNECT_TIMEOUT, connect_async(ws_url))
            .await
            .map_err(|_| Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64))??;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(Self::run_io_loop(
            ws_stream,
            outbound_rx,
            shutdown_rx,
            dispatcher,
        ));

        Ok(Self {
            outbound: outbound_tx,
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }

    /// Returns a clone of the outbound frame sink.
    #[must_use]
    pub fn outbound_sink(&self) -> mpsc::UnboundedSender<String> {
        self.outbound.clone()
    }

    /// Shuts the connection down gracefully.
    ///
    /// Idempotent; the second call is a no-op.
    pub fn close(&self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
        }
    }

    /// I/O loop: pumps inbound frames into the dispatcher and outbound
    /// frames onto the socket.
    async fn run_io_loop(
        ws_stream: WsStream,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown_rx: oneshot::Receiver<()>,
        dispatcher: Arc<WebSocketDispatcher>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        if let Err(e) = dispatcher.dispatch_socket_event("open", &serde_json::Value::Null) {
            error!(error = %e, "open handler failed");
        }

        loop {
            tokio::select! {
                // Inbound frames from the remote end
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            if let Err(e) = dispatcher.dispatch_frame(&text) {
                                // Handler errors are surfaced, never
                                // swallowed; fatality is the supervising
                                // layer's call.
                                error!(error = %e, "Event handler failed");
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            let frame = json!({"message": e.to_string()});
                            if let Err(e) = dispatcher.dispatch_socket_event("error", &frame) {
                                error!(error = %e, "error handler failed");
                            }
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Outbound frames from senders
                frame = outbound_rx.recv() => {
                    match frame {
                        Some(text) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(error = %e, "Failed to send frame");
                                let frame = json!({"message": e.to_string()});
                                if let Err(e) = dispatcher.dispatch_socket_event("error", &frame) {
                                    error!(error = %e, "error handler failed");
                                }
                                break;
                            }
                        }
                        None => {
                            debug!("Outbound channel closed");
                            break;
                        }
                    }
                }

                // Shutdown from the owning client
                _ = &mut shutdown_rx => {
                    debug!("Shutdown requested");
                    let _ = ws_write.close().await;
                    break;
                }
            }
        }

        if let Err(e) = dispatcher.dispatch_socket_event("close", &serde_json::Value::Null) {
            error!(error = %e, "close handler failed");
        }
        debug!("I/O loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
