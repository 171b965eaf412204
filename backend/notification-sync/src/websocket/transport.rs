/// Push transport seam
///
/// The connection manager talks to the wire through a pair of channels, the
/// same way the server side hands each socket an `mpsc` sender. A `Connector`
/// opens one transport and returns those channels; a background pump owns the
/// actual socket.
use crate::credentials::SessionToken;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use resilience::timeout::{with_timeout_result, TimeoutError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

/// Something the transport reports to the manager
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text payload, not yet decoded
    Text(String),
    /// The transport closed or failed; nothing follows
    Closed { reason: Option<String> },
}

/// Something the manager asks the transport to do
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Send(String),
    Close,
}

/// Channels of one open transport
pub struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<TransportCommand>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `url` authenticated with `credential`
    async fn open(&self, url: &str, credential: &SessionToken) -> Result<TransportHandle>;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    auth_scheme: String,
    handshake_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(auth_scheme: impl Into<String>, handshake_timeout: Duration) -> Self {
        Self {
            auth_scheme: auth_scheme.into(),
            handshake_timeout,
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &str, credential: &SessionToken) -> Result<TransportHandle> {
        let mut request = url
            .into_client_request()
            .map_err(|e| SyncError::Config(format!("invalid push url {}: {}", url, e)))?;
        let header = HeaderValue::from_str(&format!("{} {}", self.auth_scheme, credential.expose()))
            .map_err(|_| SyncError::Auth("session token is not a valid header value".to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        let (stream, _) = with_timeout_result(
            self.handshake_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|e| match e {
            TimeoutError::Elapsed(d) => {
                SyncError::Connection(format!("handshake timed out after {:?}", d))
            }
            TimeoutError::OperationFailed(e) => SyncError::Connection(e.to_string()),
        })?;

        info!("WebSocket handshake with {} completed", url);

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<TransportCommand>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = outbound_rx.recv() => match command {
                        Some(TransportCommand::Send(text)) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                let _ = inbound_tx.send(TransportEvent::Closed {
                                    reason: Some(e.to_string()),
                                });
                                break;
                            }
                        }
                        Some(TransportCommand::Close) | None => {
                            let _ = sink.send(Message::Close(None)).await;
                            debug!("WebSocket closed by client");
                            break;
                        }
                    },
                    message = source.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let _ = inbound_tx.send(TransportEvent::Text(text));
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            let text = String::from_utf8_lossy(&bytes).into_owned();
                            let _ = inbound_tx.send(TransportEvent::Text(text));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let _ = inbound_tx.send(TransportEvent::Closed {
                                reason: frame.map(|f| format!("{} {}", f.code, f.reason)),
                            });
                            break;
                        }
                        // Ping/Pong are answered by tungstenite itself
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("WebSocket read error: {}", e);
                            let _ = inbound_tx.send(TransportEvent::Closed {
                                reason: Some(e.to_string()),
                            });
                            break;
                        }
                        None => {
                            let _ = inbound_tx.send(TransportEvent::Closed { reason: None });
                            break;
                        }
                    },
                }
            }
        });

        Ok(TransportHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Server side of an in-memory transport
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<TransportCommand>,
}

impl MemoryPeer {
    /// Deliver a raw text payload to the client
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(TransportEvent::Text(text.into())).is_ok()
    }

    /// Close the transport from the server side
    pub fn close(&self, reason: Option<&str>) -> bool {
        self.to_client
            .send(TransportEvent::Closed {
                reason: reason.map(str::to_string),
            })
            .is_ok()
    }

    /// Next command written by the client, `None` once the client is gone
    pub async fn next_command(&mut self) -> Option<TransportCommand> {
        self.from_client.recv().await
    }

    pub fn try_next_command(&mut self) -> Option<TransportCommand> {
        self.from_client.try_recv().ok()
    }
}

#[derive(Default)]
struct MemoryState {
    refuse: bool,
    open_attempts: usize,
    tokens: Vec<SessionToken>,
    peers: VecDeque<MemoryPeer>,
}

/// In-memory connector for tests and embedding
///
/// Every successful `open` queues a `MemoryPeer` the caller can drive.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
    opened: Arc<Notify>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent opens fail (or succeed again)
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().refuse = refuse;
    }

    /// Number of `open` calls, successful or not
    pub fn open_attempts(&self) -> usize {
        self.state.lock().open_attempts
    }

    pub fn tokens_seen(&self) -> Vec<SessionToken> {
        self.state.lock().tokens.clone()
    }

    /// Wait for the next successfully opened transport
    pub async fn accept(&self) -> MemoryPeer {
        loop {
            let notified = self.opened.notified();
            if let Some(peer) = self.state.lock().peers.pop_front() {
                return peer;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, url: &str, credential: &SessionToken) -> Result<TransportHandle> {
        let mut state = self.state.lock();
        state.open_attempts += 1;
        state.tokens.push(credential.clone());

        if state.refuse {
            return Err(SyncError::Connection(format!("connection to {} refused", url)));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        state.peers.push_back(MemoryPeer {
            to_client,
            from_client,
        });
        drop(state);
        self.opened.notify_waiters();

        Ok(TransportHandle { outbound, inbound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_connector_round_trip() {
        let connector = MemoryConnector::new();
        let token = SessionToken::new("tok");

        let mut handle = connector.open("memory://push", &token).await.unwrap();
        let mut peer = connector.accept().await;
        assert_eq!(peer.try_next_command(), None);

        assert!(peer.push_text(r#"{"type":"pong"}"#));
        assert_eq!(
            handle.inbound.recv().await,
            Some(TransportEvent::Text(r#"{"type":"pong"}"#.to_string()))
        );

        handle
            .outbound
            .send(TransportCommand::Send("hello".to_string()))
            .unwrap();
        assert_eq!(
            peer.next_command().await,
            Some(TransportCommand::Send("hello".to_string()))
        );
        assert_eq!(connector.tokens_seen(), vec![token]);
    }

    #[tokio::test]
    async fn test_memory_connector_refusal() {
        let connector = MemoryConnector::new();
        connector.refuse_connections(true);

        let result = connector
            .open("memory://push", &SessionToken::new("tok"))
            .await;

        assert!(matches!(result, Err(SyncError::Connection(_))));
        assert_eq!(connector.open_attempts(), 1);
    }
}
