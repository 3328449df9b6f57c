//! End-to-end tests: the driver against in-memory links and a local
//! WebSocket assistant.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use lti_common::{LtiError, Rejection, TransportError};
use lti_config::LtiConfig;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::*;
use crate::connection::{ConnectionState, Connector, Link, LinkEvent, RetryPolicy};
use crate::controller::{ChatOptions, ChatUpdate, Notice};
use crate::message::Role;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// The far side of an in-memory link.
struct ServerEnd {
    requests: mpsc::Receiver<String>,
    events: mpsc::Sender<LinkEvent>,
}

impl ServerEnd {
    async fn next_request(&mut self) -> serde_json::Value {
        let raw = tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for request")
            .expect("link closed");
        serde_json::from_str(&raw).unwrap()
    }

    async fn reply(&self, frame: serde_json::Value) {
        self.events
            .send(LinkEvent::Frame(frame.to_string()))
            .await
            .unwrap();
    }
}

/// Hands out in-memory links, refusing the first `refuse` attempts.
struct MemoryConnector {
    refuse: Arc<AtomicU32>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect("connection refused".into()));
        }

        let (out_tx, out_rx) = mpsc::channel(16);
        let (in_tx, in_rx) = mpsc::channel(16);
        self.accepted
            .send(ServerEnd {
                requests: out_rx,
                events: in_tx,
            })
            .map_err(|_| TransportError::Connect("test finished".into()))?;
        Ok(Link::new(out_tx, in_rx, None))
    }
}

/// Never completes a connection.
struct HangingConnector;

#[async_trait]
impl Connector for HangingConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        std::future::pending().await
    }
}

fn options() -> ChatOptions {
    ChatOptions {
        quota_max: 8,
        welcome_message: "Hello!".into(),
        retry: RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(20),
        },
        connect_timeout: Duration::from_secs(2),
        send_exchange_id: false,
    }
}

struct Harness {
    handle: ChatHandle,
    updates: mpsc::Receiver<ChatUpdate>,
    accepted: mpsc::UnboundedReceiver<ServerEnd>,
    refuse: Arc<AtomicU32>,
}

impl Harness {
    fn start(refuse: u32) -> Self {
        let refuse = Arc::new(AtomicU32::new(refuse));
        let (accepted_tx, accepted) = mpsc::unbounded_channel();
        let connector = MemoryConnector {
            refuse: Arc::clone(&refuse),
            accepted: accepted_tx,
        };
        let (handle, updates) = ChatClient::new(&LtiConfig::default())
            .with_options(options())
            .with_connector(connector)
            .start();
        Self {
            handle,
            updates,
            accepted,
            refuse,
        }
    }

    async fn server(&mut self) -> ServerEnd {
        tokio::time::timeout(Duration::from_secs(5), self.accepted.recv())
            .await
            .expect("timed out waiting for connection")
            .expect("connector dropped")
    }

    async fn wait_for(&mut self, wanted: ChatUpdate) {
        wait_for(&mut self.updates, |u| *u == wanted).await;
    }
}

async fn wait_for(
    updates: &mut mpsc::Receiver<ChatUpdate>,
    mut matches: impl FnMut(&ChatUpdate) -> bool,
) -> ChatUpdate {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = updates.recv().await.expect("driver stopped");
            if matches(&update) {
                return update;
            }
        }
    })
    .await
    .expect("timed out waiting for update")
}

const OPEN: ChatUpdate = ChatUpdate::ConnectionChanged(ConnectionState::Open);

// ---------------------------------------------------------------------------
// In-memory links
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_and_answer_round_trip() {
    let mut h = Harness::start(0);
    let mut server = h.server().await;
    h.wait_for(OPEN).await;

    let id = h.handle.submit("What is the P/E of FPT?").await.unwrap();
    let request = server.next_request().await;
    assert_eq!(request, json!({ "message": "What is the P/E of FPT?" }));

    server
        .reply(json!({ "type": "thinking", "content": "looking up FPT" }))
        .await;
    server
        .reply(json!({ "type": "final", "content": "About 20.", "conversation_id": "c1" }))
        .await;
    h.wait_for(ChatUpdate::ExchangeClosed { id: id.clone() }).await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.conversation_id.as_deref(), Some("c1"));
    assert_eq!(snapshot.question_count, 1);
    assert_eq!(snapshot.remaining_questions, 7);
    let user = &snapshot.messages[1];
    assert_eq!(user.id(), &id);
    assert_eq!(user.reasoning(), "looking up FPT");
    assert!(!user.is_open());
    let reply = snapshot.messages.last().unwrap();
    assert_eq!(reply.role(), Role::Assistant);
    assert_eq!(reply.content(), "About 20.");
}

#[tokio::test]
async fn second_request_waits_for_the_first() {
    let mut h = Harness::start(0);
    let mut server = h.server().await;
    h.wait_for(OPEN).await;

    h.handle.submit("first").await.unwrap();
    let err = h.handle.submit("second").await.unwrap_err();
    assert!(matches!(err, LtiError::Rejected(Rejection::ExchangeOpen)));

    server.next_request().await;
    server
        .reply(json!({ "type": "final", "content": "done" }))
        .await;
    wait_for(&mut h.updates, |u| matches!(u, ChatUpdate::ExchangeClosed { .. })).await;
    assert!(h.handle.submit("second").await.is_ok());
}

#[tokio::test]
async fn reconnects_after_link_drops() {
    let mut h = Harness::start(0);
    let first = h.server().await;
    h.wait_for(OPEN).await;

    first
        .events
        .send(LinkEvent::Closed("server restarted".into()))
        .await
        .unwrap();
    h.wait_for(ChatUpdate::ConnectionChanged(ConnectionState::Closed))
        .await;

    let mut second = h.server().await;
    h.wait_for(OPEN).await;
    h.handle.submit("still there?").await.unwrap();
    assert_eq!(second.next_request().await["message"], "still there?");
}

#[tokio::test]
async fn refused_attempts_within_budget_recover() {
    let mut h = Harness::start(2);
    let _server = h.server().await;
    h.wait_for(OPEN).await;
    assert_eq!(h.refuse.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn gives_up_after_retries_until_reset() {
    let mut h = Harness::start(u32::MAX);
    h.wait_for(ChatUpdate::Notice(Notice::ConnectivityFailed))
        .await;

    let err = h.handle.submit("anyone?").await.unwrap_err();
    assert!(matches!(err, LtiError::Rejected(Rejection::NotReady)));
    assert_eq!(
        h.handle.snapshot().await.unwrap().connection,
        ConnectionState::Failed
    );

    h.refuse.store(0, Ordering::SeqCst);
    h.handle.reset().await.unwrap();
    let _server = h.server().await;
    h.wait_for(OPEN).await;
}

#[tokio::test]
async fn request_before_open_is_refused() {
    let (handle, _updates) = ChatClient::new(&LtiConfig::default())
        .with_options(options())
        .with_connector(HangingConnector)
        .start();

    let err = handle.submit("hello").await.unwrap_err();
    assert!(matches!(err, LtiError::Rejected(Rejection::NotReady)));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.question_count, 0);
}

#[tokio::test]
async fn reset_ignores_the_old_connection() {
    let mut h = Harness::start(0);
    let mut old = h.server().await;
    h.wait_for(OPEN).await;
    h.handle.submit("A").await.unwrap();
    old.next_request().await;

    h.handle.reset().await.unwrap();
    // The old link was closed, so a late answer cannot reach the session.
    let late = old
        .events
        .send(LinkEvent::Frame(
            json!({ "type": "final", "content": "late", "conversation_id": "c1" }).to_string(),
        ))
        .await;
    assert!(late.is_err());

    let _new = h.server().await;
    h.wait_for(OPEN).await;
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.messages.len(), 1);
    assert!(snapshot.messages[0].is_welcome());
    assert!(snapshot.conversation_id.is_none());
    assert_eq!(snapshot.question_count, 0);
}

#[tokio::test]
async fn driver_resumes_once_a_lagging_consumer_drains() {
    let mut h = Harness::start(0);
    let mut server = h.server().await;
    h.wait_for(OPEN).await;

    let id = h.handle.submit("Summarise VNM's last quarter").await.unwrap();
    server.next_request().await;

    // More updates than the channel holds, with nobody reading yet.
    let burst = tokio::spawn(async move {
        for n in 0..300 {
            server
                .reply(json!({ "type": "thinking", "content": format!("step {n}") }))
                .await;
        }
        server
            .reply(json!({ "type": "final", "content": "Revenue grew.", "conversation_id": "c9" }))
            .await;
        server
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.wait_for(ChatUpdate::ExchangeClosed { id: id.clone() }).await;
    let _server = tokio::time::timeout(Duration::from_secs(5), burst)
        .await
        .expect("burst stalled after draining")
        .unwrap();

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.conversation_id.as_deref(), Some("c9"));
    let user = snapshot.messages.iter().find(|m| m.id() == &id).unwrap();
    assert_eq!(user.reasoning().lines().count(), 300);
    assert_eq!(snapshot.messages.last().unwrap().content(), "Revenue grew.");
}

#[tokio::test]
async fn shutdown_closes_link_and_stops_driver() {
    let mut h = Harness::start(0);
    let mut server = h.server().await;
    h.wait_for(OPEN).await;

    h.handle.shutdown().await.unwrap();
    assert_eq!(server.requests.recv().await, None);

    let err = h.handle.submit("hello").await.unwrap_err();
    assert!(matches!(err, LtiError::ChannelClosed));
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// A local assistant that answers every request with one thinking frame
/// and an echoing final frame. Every request it sees is forwarded.
async fn spawn_assistant() -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = seen_tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let WsMessage::Text(text) = msg else {
                        continue;
                    };
                    let request: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                    let question = request["message"].as_str().unwrap_or_default().to_owned();
                    let _ = seen.send(request);

                    let thinking = json!({ "type": "thinking", "content": "reading the question" });
                    let answer = json!({
                        "type": "final",
                        "content": format!("echo: {question}"),
                        "conversation_id": "c1",
                    });
                    if ws.send(WsMessage::Text(thinking.to_string().into())).await.is_err()
                        || ws.send(WsMessage::Text(answer.to_string().into())).await.is_err()
                    {
                        return;
                    }
                }
            });
        }
    });

    (url, seen_rx)
}

#[tokio::test]
async fn websocket_conversation_echoes_conversation_id() {
    let (url, mut seen) = spawn_assistant().await;
    let mut config = LtiConfig::default();
    config.connection.url = url;

    let (handle, mut updates) = ChatClient::new(&config).start();
    wait_for(&mut updates, |u| *u == OPEN).await;

    let first = handle.submit("hello").await.unwrap();
    wait_for(&mut updates, |u| *u == ChatUpdate::ExchangeClosed { id: first.clone() }).await;
    assert_eq!(seen.recv().await.unwrap(), json!({ "message": "hello" }));

    let second = handle.submit("again").await.unwrap();
    wait_for(&mut updates, |u| *u == ChatUpdate::ExchangeClosed { id: second.clone() }).await;
    assert_eq!(
        seen.recv().await.unwrap(),
        json!({ "message": "again", "conversation_id": "c1" })
    );

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.question_count, 2);
    assert_eq!(snapshot.messages.last().unwrap().content(), "echo: again");
    assert_eq!(snapshot.messages[1].reasoning(), "reading the question");

    handle.shutdown().await.unwrap();
}
