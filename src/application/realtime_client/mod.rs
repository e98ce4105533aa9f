//! RealtimeClient - one authenticated, self-healing realtime connection.
//!
//! ## Lifecycle
//!
//! ```text
//! connect(token) ─▶ CONNECTING ─open─▶ CONNECTED ─close 1000─▶ DISCONNECTED
//!                        │                 │
//!                        │ error/timeout   │ close ≠ 1000
//!                        ▼                 ▼
//!                   DISCONNECTED ◀──── reconnect after base * 2^attempt
//! ```
//!
//! Every connection attempt gets a new generation number. Background tasks
//! (reader, keep-alive, reconnect timer) carry the generation they were
//! started for and do nothing once it is stale, so `disconnect()` can be
//! called from anywhere, including from inside a listener.

mod listeners;
mod reconnect;

pub use listeners::MessageListener;
pub use reconnect::ReconnectPolicy;

use futures::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

use crate::domain::foundation::{ConnectionState, DomainError, ErrorCode, ListenerId, StateMachine};
use crate::domain::realtime::{
    ListenerChannel, MessageType, TransportMessage, ABNORMAL_CLOSURE, NORMAL_CLOSURE,
};
use crate::ports::{InboundFrame, OutboundFrame, Transport, TransportError, TransportLink};

use listeners::ListenerRegistry;

/// Errors returned by [`RealtimeClient::connect`] and [`RealtimeClient::send`].
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid realtime URL: {0}")]
    InvalidUrl(String),

    #[error("Connection attempt was superseded by disconnect or a newer attempt")]
    Superseded,

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RealtimeError> for DomainError {
    fn from(err: RealtimeError) -> Self {
        let code = match &err {
            RealtimeError::Serialization(_) => ErrorCode::MalformedMessage,
            _ => ErrorCode::ConnectionFailed,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Configuration for the realtime client.
#[derive(Debug, Clone)]
pub struct RealtimeClientConfig {
    /// Endpoint without the token; the token is appended as `?token=`.
    pub url: Url,

    /// How often a `{"type":"ping"}` frame is sent while connected.
    ///
    /// Default: 30 seconds
    pub keepalive_interval: Duration,

    /// How long an open attempt may take before it fails.
    ///
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    pub reconnect: ReconnectPolicy,
}

impl RealtimeClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            keepalive_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

/// Mutable connection bookkeeping, guarded by one mutex.
#[derive(Default)]
struct ConnectionSlot {
    state: ConnectionState,
    generation: u64,
    attempts: u32,
    paused: bool,
    last_token: Option<SecretString>,
    outbound: Option<mpsc::UnboundedSender<OutboundFrame>>,
    reader: Option<JoinHandle<()>>,
    keepalive: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl ConnectionSlot {
    fn transition(&mut self, target: ConnectionState) {
        if self.state == target {
            return;
        }
        match self.state.transition_to(target) {
            Ok(next) => {
                tracing::debug!(from = %self.state, to = %next, "Connection state changed");
                self.state = next;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid connection state transition"),
        }
    }

    /// Moves to CONNECTING and returns the generation of the new attempt.
    fn begin_attempt(&mut self) -> u64 {
        self.transition(ConnectionState::Connecting);
        self.generation += 1;
        self.generation
    }

    fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && self.state == ConnectionState::Connected
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: RealtimeClientConfig,
    slot: Mutex<ConnectionSlot>,
    listeners: ListenerRegistry,
    /// Bumped each time `disconnect` clears the listener registry.
    resets: watch::Sender<u64>,
}

/// Realtime client. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl RealtimeClient {
    pub fn new(transport: Arc<dyn Transport>, config: RealtimeClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                slot: Mutex::new(ConnectionSlot::default()),
                listeners: ListenerRegistry::default(),
                resets: watch::channel(0).0,
            }),
        }
    }

    pub fn config(&self) -> &RealtimeClientConfig {
        &self.inner.config
    }

    /// Opens the connection.
    ///
    /// Resolves immediately if a connection is already being opened or is
    /// open. Otherwise resolves once the transport is open, or fails if it
    /// errors (or times out) first; a failed attempt still schedules a
    /// reconnect with the same token.
    pub async fn connect(&self, token: SecretString) -> Result<(), RealtimeError> {
        let generation = {
            let mut slot = self.inner.slot();
            if slot.state.is_active() {
                tracing::debug!(state = %slot.state, "connect() ignored, connection already active");
                return Ok(());
            }
            if let Some(timer) = slot.reconnect.take() {
                timer.abort();
            }
            slot.attempts = 0;
            slot.last_token = Some(token.clone());
            slot.begin_attempt()
        };

        Arc::clone(&self.inner).open(token, generation).await
    }

    /// Closes the connection with code 1000 and resets the client.
    ///
    /// Stops the keep-alive, cancels any pending reconnect and removes
    /// every listener. Safe to call at any time.
    pub fn disconnect(&self) {
        {
            let mut slot = self.inner.slot();
            slot.generation += 1;
            slot.attempts = 0;
            for handle in [slot.reconnect.take(), slot.keepalive.take(), slot.reader.take()]
                .into_iter()
                .flatten()
            {
                handle.abort();
            }
            if let Some(outbound) = slot.outbound.take() {
                slot.transition(ConnectionState::Closing);
                let _ = outbound.send(OutboundFrame::Close {
                    code: NORMAL_CLOSURE,
                    reason: "client disconnect".to_string(),
                });
            }
            slot.transition(ConnectionState::Disconnected);
        }
        self.inner.listeners.clear();
        self.inner.resets.send_modify(|count| *count += 1);
        tracing::info!("Realtime client disconnected");
    }

    /// Changes every time [`disconnect`](Self::disconnect) drops the
    /// registered listeners. Long-lived subscribers watch it to register
    /// again.
    pub fn listener_resets(&self) -> watch::Receiver<u64> {
        self.inner.resets.subscribe()
    }

    /// Sends a message if connected; otherwise logs a warning and drops it.
    pub fn send(&self, message: &TransportMessage) -> Result<(), RealtimeError> {
        let slot = self.inner.slot();
        let outbound = match (&slot.outbound, slot.state) {
            (Some(outbound), ConnectionState::Connected) => outbound,
            _ => {
                tracing::warn!(
                    message_type = %message.message_type,
                    state = %slot.state,
                    "Not connected, dropping outgoing message"
                );
                return Ok(());
            }
        };

        let text = message.to_json()?;
        if outbound.send(OutboundFrame::Text(text)).is_err() {
            tracing::warn!(message_type = %message.message_type, "Transport closed, message dropped");
        }
        Ok(())
    }

    /// Registers `listener` on `channel` (a message type or [`ListenerChannel::All`]).
    pub fn on(
        &self,
        channel: impl Into<ListenerChannel>,
        listener: impl MessageListener + 'static,
    ) -> ListenerId {
        self.inner.listeners.add(channel.into(), Arc::new(listener))
    }

    /// Unregisters a listener. Returns false if it was not registered there.
    pub fn off(&self, channel: impl Into<ListenerChannel>, id: ListenerId) -> bool {
        self.inner.listeners.remove(&channel.into(), id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.contains(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.slot().state
    }

    /// Reconnect attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.slot().attempts
    }

    /// Token of the most recent `connect` call.
    pub fn last_token(&self) -> Option<SecretString> {
        self.inner.slot().last_token.clone()
    }

    /// While paused, scheduled reconnects are skipped when they fire.
    pub fn set_reconnect_paused(&self, paused: bool) {
        self.inner.slot().paused = paused;
    }
}

impl ClientInner {
    fn slot(&self) -> MutexGuard<'_, ConnectionSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn connection_url(&self, token: &SecretString) -> Url {
        let mut url = self.config.url.clone();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "token")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair("token", token.expose_secret());
        url
    }

    async fn establish(&self, token: &SecretString) -> Result<TransportLink, RealtimeError> {
        let url = self.connection_url(token);
        match tokio::time::timeout(self.config.connect_timeout, self.transport.open(&url)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RealtimeError::Timeout(self.config.connect_timeout)),
        }
    }

    // Boxed because a failed attempt schedules a reconnect that opens again.
    fn open(
        self: Arc<Self>,
        token: SecretString,
        generation: u64,
    ) -> BoxFuture<'static, Result<(), RealtimeError>> {
        Box::pin(async move {
            let result = self.establish(&token).await;

            let mut slot = self.slot();
            if slot.generation != generation {
                // Superseded by disconnect() or a newer attempt.
                let link = result?;
                let _ = link.outbound.send(OutboundFrame::Close {
                    code: NORMAL_CLOSURE,
                    reason: "superseded".to_string(),
                });
                return Err(RealtimeError::Superseded);
            }

            match result {
                Ok(link) => {
                    slot.transition(ConnectionState::Connected);
                    slot.attempts = 0;
                    slot.outbound = Some(link.outbound);
                    slot.reader = Some(tokio::spawn(
                        Arc::clone(&self).read_loop(link.inbound, generation),
                    ));
                    slot.keepalive = Some(tokio::spawn(Arc::clone(&self).keepalive_loop(generation)));
                    tracing::info!(url = %self.config.url, "Realtime connection established");
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Realtime connection attempt failed");
                    slot.transition(ConnectionState::Disconnected);
                    self.schedule_reconnect(&mut slot);
                    Err(e)
                }
            }
        })
    }

    fn schedule_reconnect(self: &Arc<Self>, slot: &mut ConnectionSlot) {
        let policy = &self.config.reconnect;
        if !policy.allows(slot.attempts) {
            tracing::warn!(attempts = slot.attempts, "Reconnect attempts exhausted, staying disconnected");
            return;
        }
        let Some(token) = slot.last_token.clone() else {
            return;
        };

        let delay = policy.delay_for(slot.attempts);
        slot.attempts += 1;
        let generation = slot.generation;
        tracing::info!(
            attempt = slot.attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let inner = Arc::clone(self);
        slot.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire_reconnect(token, generation).await;
        }));
    }

    async fn fire_reconnect(self: Arc<Self>, token: SecretString, generation: u64) {
        let next = {
            let mut slot = self.slot();
            if slot.generation != generation || slot.state.is_active() {
                return;
            }
            if slot.paused {
                tracing::debug!("Reconnect skipped while paused");
                return;
            }
            slot.reconnect = None;
            slot.begin_attempt()
        };

        if let Err(e) = self.open(token, next).await {
            tracing::debug!(error = %e, "Reconnect attempt failed");
        }
    }

    async fn read_loop(
        self: Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<InboundFrame>,
        generation: u64,
    ) {
        while let Some(frame) = inbound.recv().await {
            if !self.slot().is_live(generation) {
                return;
            }
            match frame {
                InboundFrame::Text(text) => self.handle_text(&text),
                InboundFrame::Error(e) => tracing::warn!(error = %e, "Realtime transport error"),
                InboundFrame::Closed { code, reason } => {
                    self.handle_close(generation, code, &reason);
                    return;
                }
            }
        }
        self.handle_close(generation, ABNORMAL_CLOSURE, "transport dropped");
    }

    fn handle_text(&self, text: &str) {
        let message = match TransportMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed realtime frame");
                return;
            }
        };

        match &message.message_type {
            MessageType::Pong => tracing::trace!("Received pong"),
            MessageType::Connected => tracing::debug!("Server acknowledged connection"),
            MessageType::Other(name) => tracing::debug!(message_type = %name, "Unrecognized message type"),
            _ => {}
        }

        self.listeners.dispatch(&message);
    }

    fn handle_close(self: &Arc<Self>, generation: u64, code: u16, reason: &str) {
        let mut slot = self.slot();
        if !slot.is_live(generation) {
            return;
        }
        if let Some(keepalive) = slot.keepalive.take() {
            keepalive.abort();
        }
        slot.reader = None;
        slot.outbound = None;
        slot.transition(ConnectionState::Disconnected);

        if code == NORMAL_CLOSURE {
            tracing::info!(reason, "Realtime connection closed");
        } else {
            tracing::warn!(code, reason, "Realtime connection lost");
            self.schedule_reconnect(&mut slot);
        }
    }

    async fn keepalive_loop(self: Arc<Self>, generation: u64) {
        let period = self.config.keepalive_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let ping = match TransportMessage::ping().to_json() {
                Ok(ping) => ping,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode keep-alive");
                    return;
                }
            };
            {
                let slot = self.slot();
                if !slot.is_live(generation) {
                    return;
                }
                if let Some(outbound) = &slot.outbound {
                    let _ = outbound.send(OutboundFrame::Text(ping));
                }
            }
            tracing::trace!("Sent keep-alive");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::{InMemoryServer, InMemoryTransport};
    use crate::domain::entity::EntityKind;
    use serde_json::{json, Value};
    use std::sync::Mutex as StdMutex;

    fn client() -> (RealtimeClient, InMemoryTransport, InMemoryServer) {
        let (transport, server) = InMemoryTransport::new();
        let config = RealtimeClientConfig::new(Url::parse("ws://realtime.test/ws?v=2").unwrap());
        let client = RealtimeClient::new(Arc::new(transport.clone()), config);
        (client, transport, server)
    }

    fn token(value: &str) -> SecretString {
        SecretString::new(value.to_string())
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn frame(message_type: &str, data: Value) -> String {
        json!({"type": message_type, "data": data}).to_string()
    }

    #[tokio::test]
    async fn connect_carries_token_and_keeps_query() {
        let (client, _transport, mut server) = client();

        client.connect(token("tok-1")).await.unwrap();
        let connection = server.accept().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(connection.token().as_deref(), Some("tok-1"));
        assert!(connection.url().query_pairs().any(|(k, v)| k == "v" && v == "2"));
    }

    #[tokio::test]
    async fn connect_twice_opens_one_connection() {
        let (client, transport, _server) = client();

        let (first, second) = tokio::join!(client.connect(token("t")), client.connect(token("t")));
        client.connect(token("t")).await.unwrap();

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_open_rejects_and_leaves_disconnected() {
        let (client, transport, _server) = client();
        transport.refuse_next(1);

        let err = client.connect(token("t")).await.unwrap_err();

        assert!(matches!(err, RealtimeError::Transport(TransportError::ConnectionRefused(_))));
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.reconnect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_open_times_out() {
        let (client, transport, _server) = client();
        transport.set_hang(true);

        let err = client.connect(token("t")).await.unwrap_err();

        assert!(matches!(err, RealtimeError::Timeout(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_open_rejects_the_pending_connect() {
        let (client, transport, mut server) = client();
        transport.set_open_delay(Some(Duration::from_millis(200)));

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.connect(token("t")).await }
        });
        tokio::task::yield_now().await;
        client.disconnect();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(RealtimeError::Superseded)));
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);

        let mut late = server.accept().await.unwrap();
        assert!(matches!(
            late.try_recv(),
            Some(OutboundFrame::Close { code: NORMAL_CLOSURE, .. })
        ));
    }

    #[tokio::test]
    async fn disconnect_signals_listener_reset() {
        let (client, _transport, _server) = client();
        let mut resets = client.listener_resets();
        client.on(MessageType::StatsUpdate, |_: &TransportMessage| {});

        client.disconnect();

        assert!(resets.has_changed().unwrap());
        assert_eq!(*resets.borrow_and_update(), 1);
        assert_eq!(client.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_pings_every_interval() {
        let (client, _transport, mut server) = client();
        client.connect(token("t")).await.unwrap();
        let mut connection = server.accept().await.unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(connection.try_recv().is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            connection.try_recv(),
            Some(OutboundFrame::Text(r#"{"type":"ping"}"#.to_string()))
        );
    }

    #[tokio::test]
    async fn all_listener_sees_messages_in_order() {
        let (client, _transport, mut server) = client();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        client.on(ListenerChannel::All, move |m: &TransportMessage| {
            sink.lock().unwrap().push(m.message_type.to_string());
        });

        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();
        connection.send_text(frame("client_created", json!({})));
        connection.send_text(frame("task_updated", json!({})));
        connection.send_text(frame("stats_update", json!({})));
        settle().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["client_created", "task_updated", "stats_update"]
        );
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let (client, _transport, mut server) = client();
        let count = Arc::new(StdMutex::new(0));
        let sink = count.clone();
        client.on(MessageType::Created(EntityKind::Task), move |_: &TransportMessage| {
            *sink.lock().unwrap() += 1;
        });

        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();
        connection.send_text("{not json");
        connection.send_text(r#"{"data":{}}"#);
        connection.send_text(frame("task_created", json!({})));
        settle().await;

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn send_when_disconnected_is_noop() {
        let (client, _transport, _server) = client();
        let message = TransportMessage::new(MessageType::Ping, Value::Null);
        assert!(client.send(&message).is_ok());
    }

    #[tokio::test]
    async fn send_transmits_when_connected() {
        let (client, _transport, mut server) = client();
        client.connect(token("t")).await.unwrap();
        let mut connection = server.accept().await.unwrap();

        client.send(&TransportMessage::ping()).unwrap();

        assert_eq!(
            connection.recv().await,
            Some(OutboundFrame::Text(r#"{"type":"ping"}"#.to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_closes_normally_and_clears_listeners() {
        let (client, transport, mut server) = client();
        let id = client.on(ListenerChannel::All, |_: &TransportMessage| {});
        client.connect(token("t")).await.unwrap();
        let mut connection = server.accept().await.unwrap();

        client.disconnect();

        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert!(!client.has_listener(id));
        assert_eq!(
            connection.recv().await,
            Some(OutboundFrame::Close {
                code: NORMAL_CLOSURE,
                reason: "client disconnect".to_string()
            })
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_when_idle_is_safe() {
        let (client, _transport, _server) = client();
        client.disconnect();
        client.disconnect();
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_inside_listener_is_safe() {
        let (client, _transport, mut server) = client();
        let handle = client.clone();
        let calls = Arc::new(StdMutex::new(0));
        let sink = calls.clone();
        client.on(ListenerChannel::All, move |_: &TransportMessage| {
            *sink.lock().unwrap() += 1;
            handle.disconnect();
        });

        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();
        connection.send_text(frame("client_created", json!({})));
        connection.send_text(frame("client_created", json!({})));
        settle().await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn normal_server_close_does_not_reconnect() {
        let (client, transport, mut server) = client();
        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();

        connection.close(NORMAL_CLOSURE, "bye");
        settle().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abnormal_close_reconnects_with_last_token() {
        let (client, _transport, mut server) = client();
        client.connect(token("tok-9")).await.unwrap();
        let connection = server.accept().await.unwrap();

        connection.drop_abnormally();
        settle().await;
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.reconnect_attempts(), 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        settle().await;

        let reconnected = server.try_accept().unwrap();
        assert_eq!(reconnected.token().as_deref(), Some("tok-9"));
        assert!(client.is_connected());
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_are_bounded_with_growing_delays() {
        let (client, transport, mut server) = client();
        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();

        transport.set_refuse_all(true);
        connection.drop_abnormally();
        tokio::time::sleep(Duration::from_secs(300)).await;

        let instants = transport.open_instants();
        assert_eq!(instants.len(), 1 + 5);
        let delays: Vec<Duration> = instants[1..]
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect();
        assert!(delays.windows(2).all(|pair| pair[1] >= pair[0]));
        assert_eq!(client.reconnect_attempts(), 5);
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_reconnects_do_not_fire() {
        let (client, transport, mut server) = client();
        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();

        client.set_reconnect_paused(true);
        connection.drop_abnormally();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.open_count(), 1);
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_connect_cancels_pending_reconnect() {
        let (client, transport, mut server) = client();
        client.connect(token("t")).await.unwrap();
        let connection = server.accept().await.unwrap();

        connection.drop_abnormally();
        settle().await;
        client.connect(token("t2")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.last_token().unwrap().expose_secret(), "t2");
    }

    #[tokio::test]
    async fn off_unregisters_listener() {
        let (client, _transport, _server) = client();
        let id = client.on(MessageType::StatsUpdate, |_: &TransportMessage| {});

        assert!(client.has_listener(id));
        assert!(client.off(MessageType::StatsUpdate, id));
        assert!(!client.has_listener(id));
        assert_eq!(client.listener_count(), 0);
    }
}
