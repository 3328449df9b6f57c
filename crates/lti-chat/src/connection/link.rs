//! Transport links: one live bidirectional text channel per connection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use lti_common::TransportError;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// How long `Link::close` waits for the pump to flush the close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Something that happened on the inbound side of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One text payload, exactly as received.
    Frame(String),
    /// The link is gone. No further events follow.
    Closed(String),
}

/// Opens links to the assistant service.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Link, TransportError>;
}

/// An open connection.
///
/// The socket itself is owned by a pump task. Dropping a `Link` aborts
/// the pump, so a link never outlives its owner; `close` additionally
/// sends a close frame first.
pub struct Link {
    outbound: Option<mpsc::Sender<String>>,
    inbound: mpsc::Receiver<LinkEvent>,
    pump: Option<JoinHandle<()>>,
}

impl Link {
    /// Assemble a link from its channels. `pump` is the task that moves
    /// data between the channels and the socket, if there is one.
    pub fn new(
        outbound: mpsc::Sender<String>,
        inbound: mpsc::Receiver<LinkEvent>,
        pump: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound,
            pump,
        }
    }

    pub async fn send(&self, payload: String) -> Result<(), TransportError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| TransportError::Closed("link is closing".into()))?;
        outbound
            .send(payload)
            .await
            .map_err(|_| TransportError::Closed("link pump stopped".into()))
    }

    /// Next inbound event. `None` means the pump ended without saying why.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.inbound.recv().await
    }

    /// Close gracefully: stop the outbound side so the pump sends a close
    /// frame, then wait briefly for it to finish.
    pub async fn close(mut self) {
        self.outbound.take();
        if let Some(pump) = self.pump.as_mut() {
            if tokio::time::timeout(CLOSE_GRACE, pump).await.is_ok() {
                self.pump = None;
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("closing", &self.outbound.is_none())
            .field("has_pump", &self.pump.is_some())
            .finish()
    }
}

/// Connects over WebSocket (`ws://` or `wss://`).
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        info!(url = %self.url, "Connecting to assistant service");
        let (ws, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let pump = tokio::spawn(ws_pump(ws, outbound_rx, inbound_tx));
        Ok(Link::new(outbound_tx, inbound_rx, Some(pump)))
    }
}

/// Move frames between the socket and the link channels until either
/// side goes away.
async fn ws_pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::Receiver<String>,
    inbound: mpsc::Sender<LinkEvent>,
) {
    let (mut sink, mut stream) = ws.split();

    let reason = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(text) => {
                    if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                        break format!("send failed: {e}");
                    }
                }
                None => {
                    // Local teardown.
                    let _ = sink.send(WsMessage::Close(None)).await;
                    debug!("Link closed locally");
                    return;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    if inbound.send(LinkEvent::Frame(text.as_str().to_owned())).await.is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        if inbound.send(LinkEvent::Frame(text)).await.is_err() {
                            return;
                        }
                    }
                    Err(_) => warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    break match frame {
                        Some(frame) => {
                            format!("server closed ({}): {}", frame.code, frame.reason.as_str())
                        }
                        None => "server closed".to_string(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("websocket error: {e}"),
                None => break "stream ended".to_string(),
            },
        }
    };

    info!(reason = %reason, "Link lost");
    let _ = inbound.send(LinkEvent::Closed(reason)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_link() -> (Link, mpsc::Receiver<String>, mpsc::Sender<LinkEvent>) {
        let (out_tx, out_rx) = mpsc::channel(8);
        let (in_tx, in_rx) = mpsc::channel(8);
        (Link::new(out_tx, in_rx, None), out_rx, in_tx)
    }

    #[tokio::test]
    async fn send_and_recv_through_channels() {
        let (mut link, mut out_rx, in_tx) = memory_link();
        link.send("hello".into()).await.unwrap();
        assert_eq!(out_rx.recv().await.as_deref(), Some("hello"));

        in_tx.send(LinkEvent::Frame("{}".into())).await.unwrap();
        assert_eq!(link.recv().await, Some(LinkEvent::Frame("{}".into())));
    }

    #[tokio::test]
    async fn send_fails_once_far_side_is_gone() {
        let (link, out_rx, _in_tx) = memory_link();
        drop(out_rx);
        let err = link.send("x".into()).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed(_)));
    }

    #[tokio::test]
    async fn close_stops_outbound_side() {
        let (link, mut out_rx, _in_tx) = memory_link();
        link.close().await;
        assert_eq!(out_rx.recv().await, None);
    }

    #[tokio::test]
    async fn drop_aborts_pump() {
        let (out_tx, _out_rx) = mpsc::channel::<String>(1);
        let (_in_tx, in_rx) = mpsc::channel(1);
        let pump = tokio::spawn(std::future::pending::<()>());
        let link = Link::new(out_tx, in_rx, Some(pump));
        drop(link);
        // Nothing to assert beyond not hanging: the pending pump was aborted.
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WsConnector::new(format!("ws://{addr}"));
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
