//! End-to-end tests against an in-process WebSocket server.
//!
//! The server stands in for the remote browser driver: it answers every
//! command frame through a test-supplied responder and pushes protocol
//! events on demand.

use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use bidi_client::{
    AddHeadersInterceptor, AuthInterceptor, Client, Command, Header, NetworkEventState,
    NetworkEvents, SessionCommand, UrlPattern,
};

// ============================================================================
// Test server
// ============================================================================

/// Handle to the in-process remote end.
struct RemoteEnd {
    /// WebSocket URL the client connects to.
    ws_url: String,
    /// Every command frame the server received.
    inbound: mpsc::UnboundedReceiver<Value>,
    /// Push channel for server-initiated event frames.
    push: mpsc::UnboundedSender<Value>,
}

/// Spawns a single-connection server answering commands via `responder`.
///
/// A `None` from the responder swallows the command: no reply frame is
/// sent, so the client's waiter runs into its timeout.
async fn spawn_remote_end<F>(responder: F) -> Result<RemoteEnd>
where
    F: Fn(&str, &Value) -> Option<Value> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (inbound_tx, inbound) = mpsc::unbounded_channel();
    let (push, mut push_rx) = mpsc::unbounded_channel::<Value>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let ws = accept_async(stream).await.expect("handshake");
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        let frame: Value = serde_json::from_str(&text).expect("client frame");
                        let method = frame["method"].as_str().unwrap_or_default().to_string();
                        let _ = inbound_tx.send(frame.clone());

                        if let (Some(id), Some(result)) =
                            (frame.get("id"), responder(&method, &frame))
                        {
                            let reply = json!({"id": id, "result": result});
                            write
                                .send(Message::Text(reply.to_string().into()))
                                .await
                                .expect("reply");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                },
                event = push_rx.recv() => match event {
                    Some(frame) => {
                        write
                            .send(Message::Text(frame.to_string().into()))
                            .await
                            .expect("push event");
                    }
                    None => break,
                },
            }
        }
    });

    Ok(RemoteEnd {
        ws_url: format!("ws://{addr}"),
        inbound,
        push,
    })
}

/// Reads server-received frames until one matches `method`.
async fn wait_for_method(inbound: &mut mpsc::UnboundedReceiver<Value>, method: &str) -> Value {
    timeout(Duration::from_secs(5), async {
        loop {
            let frame = inbound.recv().await.expect("server inbound");
            if frame["method"] == method {
                return frame;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {method} frame within 5s"))
}

/// Polls `condition` until it holds or five seconds pass.
async fn wait_until(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition within 5s");
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn session_round_trip() -> Result<()> {
    init_tracing();
    let remote = spawn_remote_end(|method, _| match method {
        "session.status" => Some(json!({"ready": true, "message": "ready"})),
        _ => Some(json!({})),
    })
    .await?;

    let client = Client::new(&remote.ws_url);
    client.start().await?;
    client.wait_until_open(Duration::from_secs(5)).await?;

    let status = client.session_status().await?;
    assert_eq!(status["result"]["ready"], true);

    // Idempotent start must not reconnect or fail.
    client.start().await?;

    client.close();
    Ok(())
}

#[tokio::test]
async fn concurrent_starts_share_one_transport() -> Result<()> {
    init_tracing();
    // The server accepts a single connection; a second handshake would
    // hang and fail the waits below.
    let remote = spawn_remote_end(|method, _| Some(json!({"echo": method}))).await?;

    let client = Client::new(&remote.ws_url);
    let (first, second) = tokio::join!(client.start(), client.start());
    first?;
    second?;

    client.wait_until_open(Duration::from_secs(5)).await?;
    let status = client.session_status().await?;
    assert_eq!(status["result"]["echo"], "session.status");

    client.close();
    Ok(())
}

#[tokio::test]
async fn subscription_delivers_network_events() -> Result<()> {
    init_tracing();
    let mut remote = spawn_remote_end(|_, _| Some(json!({}))).await?;

    let client = Client::new(&remote.ws_url);
    client.start().await?;
    client.wait_until_open(Duration::from_secs(5)).await?;

    let network = Arc::new(NetworkEvents::new("ctx-1"));
    client.on_event(&["network"], network.handler()).await?;

    // The local registration must have subscribed remotely.
    let subscribe = wait_for_method(&mut remote.inbound, "session.subscribe").await;
    assert_eq!(subscribe["params"]["events"], json!(["network"]));

    remote.push.send(json!({
        "method": "network.beforeRequestSent",
        "params": {
            "context": "ctx-1",
            "timestamp": 100,
            "request": {"request": "r1", "url": "https://example.com/", "method": "GET"}
        }
    }))?;
    remote.push.send(json!({
        "method": "network.responseCompleted",
        "params": {
            "context": "ctx-1",
            "timestamp": 180,
            "request": {"request": "r1"},
            "response": {"status": 200, "bytesReceived": 512}
        }
    }))?;

    // The frames travel through the reader task; an empty tracker is
    // vacuously idle, so wait for the request to be seen first.
    let tracker = Arc::clone(&network);
    wait_until(move || {
        tracker
            .get(&"r1".into())
            .is_some_and(|event| event.state == NetworkEventState::Completed)
    })
    .await;

    network
        .wait_until_network_idle(Duration::from_secs(5), Duration::from_millis(10))
        .await;

    let history = network.all_events();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state, NetworkEventState::Completed);
    assert_eq!(history[0].http_status_code, Some(200));
    assert_eq!(history[0].bytes_received, Some(512));

    client.close();
    Ok(())
}

#[tokio::test]
async fn header_interceptor_continues_blocked_requests() -> Result<()> {
    init_tracing();
    let mut remote = spawn_remote_end(|method, _| match method {
        "network.addIntercept" => Some(json!({"intercept": "icpt-77"})),
        _ => Some(json!({})),
    })
    .await?;

    let client = Client::new(&remote.ws_url);
    client.start().await?;
    client.wait_until_open(Duration::from_secs(5)).await?;

    let interceptor = Arc::new(AddHeadersInterceptor::new(
        client.command_manager(),
        "ctx-1",
        vec![UrlPattern::string("https://example.com/*")],
        vec![Header::new("X-Api-Key", "k-123")],
    ));
    let intercept_id = client.register_interceptor(interceptor).await?;
    assert_eq!(intercept_id.as_str(), "icpt-77");

    let add_intercept = wait_for_method(&mut remote.inbound, "network.addIntercept").await;
    assert_eq!(add_intercept["params"]["phases"], json!(["beforeRequestSent"]));
    assert_eq!(add_intercept["params"]["contexts"], json!(["ctx-1"]));
    assert_eq!(
        add_intercept["params"]["urlPatterns"],
        json!([{"type": "string", "pattern": "https://example.com/*"}])
    );

    remote.push.send(json!({
        "method": "network.beforeRequestSent",
        "params": {
            "isBlocked": true,
            "intercepts": ["icpt-77"],
            "context": "ctx-1",
            "request": {"request": "r1", "url": "https://example.com/app.css", "method": "GET"}
        }
    }))?;

    let resume = wait_for_method(&mut remote.inbound, "network.continueRequest").await;
    assert_eq!(resume["params"]["request"], "r1");
    assert_eq!(
        resume["params"]["headers"][0],
        json!({"name": "X-Api-Key", "value": {"type": "string", "value": "k-123"}})
    );

    client.close();
    Ok(())
}

#[tokio::test]
async fn auth_interceptor_gives_up_on_second_challenge() -> Result<()> {
    init_tracing();
    let mut remote = spawn_remote_end(|method, _| match method {
        "network.addIntercept" => Some(json!({"intercept": "icpt-auth"})),
        _ => Some(json!({})),
    })
    .await?;

    let client = Client::new(&remote.ws_url);
    client.start().await?;
    client.wait_until_open(Duration::from_secs(5)).await?;

    let interceptor = Arc::new(AuthInterceptor::new(
        client.command_manager(),
        "ctx-1",
        vec![],
        "user",
        "hunter2",
    ));
    client.register_interceptor(interceptor).await?;

    // No patterns configured: the field stays off the wire entirely.
    let add_intercept = wait_for_method(&mut remote.inbound, "network.addIntercept").await;
    assert!(add_intercept["params"].get("urlPatterns").is_none());

    let challenge = json!({
        "method": "network.authRequired",
        "params": {
            "isBlocked": true,
            "intercepts": ["icpt-auth"],
            "context": "ctx-1",
            "navigation": "nav-1",
            "request": {"request": "n1", "url": "https://example.com/secure"}
        }
    });

    remote.push.send(challenge.clone())?;
    let first = wait_for_method(&mut remote.inbound, "network.continueWithAuth").await;
    assert_eq!(first["params"]["action"], "provideCredentials");
    assert_eq!(first["params"]["credentials"]["username"], "user");

    // Same network id again: the server rejected the credentials.
    remote.push.send(challenge)?;
    let second = wait_for_method(&mut remote.inbound, "network.continueWithAuth").await;
    assert_eq!(second["params"]["action"], "cancel");
    assert!(second["params"].get("credentials").is_none());

    client.close();
    Ok(())
}

#[tokio::test]
async fn command_timeout_leaves_session_usable() -> Result<()> {
    init_tracing();
    // Swallow `session.end` silently so the waiter times out; answering
    // it could win the race against even a zero timeout on loopback.
    let remote =
        spawn_remote_end(|method, _| (method != "session.end").then(|| json!({"echo": method})))
            .await?;

    let client = Client::new(&remote.ws_url);
    client.start().await?;
    client.wait_until_open(Duration::from_secs(5)).await?;

    let err = client
        .send_cmd_and_wait(
            Command::Session(SessionCommand::End {}),
            Duration::from_millis(0),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    // The timed-out slot is gone; an unrelated command still works.
    let status = client.session_status().await?;
    assert_eq!(status["result"]["echo"], "session.status");

    client.close();
    Ok(())
}
