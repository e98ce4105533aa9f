//! WebSocket transport over tokio-tungstenite.
//!
//! Opens the socket, splits it, and runs two pump tasks:
//! - the writer forwards `OutboundFrame`s to the sink and stops after a close
//! - the reader forwards text frames and reports the close code (1006 when
//!   the stream ends without a close frame)

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use crate::domain::realtime::ABNORMAL_CLOSURE;
use crate::ports::{InboundFrame, OutboundFrame, Transport, TransportError, TransportLink};

/// Close code used when the peer closed without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

fn map_connect_error(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::Io(io) => TransportError::ConnectionRefused(io.to_string()),
        tungstenite::Error::Url(url) => TransportError::InvalidUrl(url.to_string()),
        tungstenite::Error::Http(response) => {
            TransportError::Handshake(format!("server responded {}", response.status()))
        }
        other => TransportError::Handshake(other.to_string()),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &Url) -> Result<TransportLink, TransportError> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(map_connect_error)?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundFrame>();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            tracing::debug!("WebSocket send failed: {}", e);
                            break;
                        }
                    }
                    OutboundFrame::Close { code, reason } => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        };
                        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                            tracing::debug!("WebSocket close failed: {}", e);
                        }
                        break;
                    }
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            let closed = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if inbound_tx.send(InboundFrame::Text(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            if inbound_tx.send(InboundFrame::Text(text)).is_err() {
                                return;
                            }
                        }
                        Err(_) => tracing::warn!("Dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => InboundFrame::Closed {
                                code: u16::from(frame.code),
                                reason: frame.reason.into_owned(),
                            },
                            None => InboundFrame::Closed {
                                code: NO_STATUS_RECEIVED,
                                reason: String::new(),
                            },
                        };
                    }
                    // Control frames are answered by tungstenite itself.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = inbound_tx.send(InboundFrame::Error(e.to_string()));
                        break InboundFrame::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: e.to_string(),
                        };
                    }
                    None => {
                        break InboundFrame::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: "stream ended".to_string(),
                        };
                    }
                }
            };
            let _ = inbound_tx.send(closed);
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_websocket_schemes() {
        let url = Url::parse("http://localhost:8080/ws").unwrap();
        let err = WebSocketTransport::new().open(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn reports_refused_connection() {
        // Port 9 (discard) is not listening on test hosts.
        let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
        let err = WebSocketTransport::new().open(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionRefused(_)));
    }
}
