//! Transport port - a bidirectional text-frame channel to the realtime server.
//!
//! The realtime client never touches sockets directly. An adapter opens the
//! connection and hands back a [`TransportLink`]: a pair of channels it
//! pumps on its own tasks. This keeps the client identical over a real
//! WebSocket and over the in-memory transport used in tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the connection with a status code; the adapter ends its pump.
    Close { code: u16, reason: String },
}

/// Frames and lifecycle notifications the adapter delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    /// The connection is gone. `1006` when no close frame was received.
    Closed { code: u16, reason: String },
    /// A transport-level error; always followed by `Closed`.
    Error(String),
}

/// An open connection.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<InboundFrame>,
}

/// Errors raised while opening a connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Connection timed out")]
    Timeout,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Port for opening realtime connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection to `url` (the token is already part of the query).
    ///
    /// Resolves once the connection is open, or fails if the transport
    /// errors before that.
    async fn open(&self, url: &Url) -> Result<TransportLink, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn Transport) {}

    #[test]
    fn transport_error_displays() {
        assert_eq!(TransportError::Timeout.to_string(), "Connection timed out");
        assert_eq!(
            TransportError::ConnectionRefused("server down".into()).to_string(),
            "Connection refused: server down"
        );
    }
}
