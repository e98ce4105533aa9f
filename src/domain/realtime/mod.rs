//! Realtime channel vocabulary: frame types and payload shapes.

mod message;
mod payload;

pub use message::{ListenerChannel, MessageType, TransportMessage, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
pub use payload::{decode_entity, DeletePayload, StatsPayload};
