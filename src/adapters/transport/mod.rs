//! Realtime transports.
//!
//! - `WebSocketTransport` - tokio-tungstenite client (production)
//! - `InMemoryTransport` - channel pairs with a scriptable server (tests, dev)

mod in_memory;
mod websocket;

pub use in_memory::{InMemoryServer, InMemoryTransport, ServerConnection};
pub use websocket::WebSocketTransport;
