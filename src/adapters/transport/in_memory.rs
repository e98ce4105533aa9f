//! In-memory transport.
//!
//! Connections are plain channel pairs. Every accepted connection is handed
//! to the paired [`InMemoryServer`], which plays the realtime server in
//! tests and local development.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::domain::realtime::{TransportMessage, ABNORMAL_CLOSURE};
use crate::ports::{InboundFrame, OutboundFrame, Transport, TransportError, TransportLink};

#[derive(Debug, Default)]
struct Behaviour {
    refuse_next: usize,
    refuse_all: bool,
    hang: bool,
    open_delay: Option<Duration>,
    opened: Vec<(Url, Instant)>,
}

#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    behaviour: Arc<Mutex<Behaviour>>,
    accepted: mpsc::UnboundedSender<ServerConnection>,
}

impl InMemoryTransport {
    /// Creates a transport and the server end that receives its connections.
    pub fn new() -> (Self, InMemoryServer) {
        let (accepted, incoming) = mpsc::unbounded_channel();
        let transport = Self {
            behaviour: Arc::new(Mutex::new(Behaviour::default())),
            accepted,
        };
        (transport, InMemoryServer { incoming })
    }

    fn behaviour(&self) -> std::sync::MutexGuard<'_, Behaviour> {
        self.behaviour.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refuses the next `count` open attempts.
    pub fn refuse_next(&self, count: usize) {
        self.behaviour().refuse_next = count;
    }

    /// Refuses every open attempt until turned off.
    pub fn set_refuse_all(&self, refuse: bool) {
        self.behaviour().refuse_all = refuse;
    }

    /// Makes open attempts never complete (exercises connect timeouts).
    pub fn set_hang(&self, hang: bool) {
        self.behaviour().hang = hang;
    }

    /// Delays every successful open by `delay`.
    pub fn set_open_delay(&self, delay: Option<Duration>) {
        self.behaviour().open_delay = delay;
    }

    /// Number of open attempts, refused ones included.
    pub fn open_count(&self) -> usize {
        self.behaviour().opened.len()
    }

    pub fn last_url(&self) -> Option<Url> {
        self.behaviour().opened.last().map(|(url, _)| url.clone())
    }

    /// When each open attempt happened, in order.
    pub fn open_instants(&self) -> Vec<Instant> {
        self.behaviour().opened.iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn open(&self, url: &Url) -> Result<TransportLink, TransportError> {
        let (hang, delay) = {
            let mut behaviour = self.behaviour();
            behaviour.opened.push((url.clone(), Instant::now()));
            if behaviour.refuse_all {
                return Err(TransportError::ConnectionRefused("server unavailable".into()));
            }
            if behaviour.refuse_next > 0 {
                behaviour.refuse_next -= 1;
                return Err(TransportError::ConnectionRefused("server unavailable".into()));
            }
            (behaviour.hang, behaviour.open_delay)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let connection = ServerConnection {
            url: url.clone(),
            to_client: inbound_tx,
            from_client: outbound_rx,
        };
        self.accepted
            .send(connection)
            .map_err(|_| TransportError::ConnectionRefused("server stopped".into()))?;

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Receives connections opened through an [`InMemoryTransport`].
#[derive(Debug)]
pub struct InMemoryServer {
    incoming: mpsc::UnboundedReceiver<ServerConnection>,
}

impl InMemoryServer {
    pub async fn accept(&mut self) -> Option<ServerConnection> {
        self.incoming.recv().await
    }

    pub fn try_accept(&mut self) -> Option<ServerConnection> {
        self.incoming.try_recv().ok()
    }
}

/// Server side of one in-memory connection.
#[derive(Debug)]
pub struct ServerConnection {
    url: Url,
    to_client: mpsc::UnboundedSender<InboundFrame>,
    from_client: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl ServerConnection {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The `token` query parameter the client connected with.
    pub fn token(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
    }

    /// Pushes a message to the client. Returns false if the client is gone.
    pub fn send(&self, message: &TransportMessage) -> bool {
        match message.to_json() {
            Ok(text) => self.send_text(text),
            Err(_) => false,
        }
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(InboundFrame::Text(text.into())).is_ok()
    }

    /// Closes the connection with `code`, as a server-initiated close.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.to_client.send(InboundFrame::Closed {
            code,
            reason: reason.into(),
        });
    }

    /// Simulates a dropped connection (no close frame).
    pub fn drop_abnormally(&self) {
        let _ = self.to_client.send(InboundFrame::Error("connection reset".into()));
        self.close(ABNORMAL_CLOSURE, "connection reset");
    }

    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.from_client.recv().await
    }

    pub fn try_recv(&mut self) -> Option<OutboundFrame> {
        self.from_client.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("ws://realtime.test/ws?token=abc").unwrap()
    }

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (transport, mut server) = InMemoryTransport::new();
        let mut link = transport.open(&url()).await.unwrap();
        let mut connection = server.accept().await.unwrap();

        assert_eq!(connection.token().as_deref(), Some("abc"));

        link.outbound.send(OutboundFrame::Text("hello".into())).unwrap();
        assert_eq!(connection.recv().await, Some(OutboundFrame::Text("hello".into())));

        connection.send_text("world");
        assert_eq!(link.inbound.recv().await, Some(InboundFrame::Text("world".into())));
    }

    #[tokio::test]
    async fn refuse_next_counts_down() {
        let (transport, _server) = InMemoryTransport::new();
        transport.refuse_next(1);

        assert!(transport.open(&url()).await.is_err());
        assert!(transport.open(&url()).await.is_ok());
        assert_eq!(transport.open_count(), 2);
    }

    #[tokio::test]
    async fn abnormal_drop_reports_1006() {
        let (transport, mut server) = InMemoryTransport::new();
        let mut link = transport.open(&url()).await.unwrap();
        let connection = server.accept().await.unwrap();

        connection.drop_abnormally();

        assert!(matches!(link.inbound.recv().await, Some(InboundFrame::Error(_))));
        assert_eq!(
            link.inbound.recv().await,
            Some(InboundFrame::Closed {
                code: ABNORMAL_CLOSURE,
                reason: "connection reset".into()
            })
        );
    }
}
