//! Realtime wire protocol.
//!
//! Every frame is a JSON text message:
//!
//! ```json
//! { "type": "client_updated", "data": { ... }, "timestamp": "2025-01-10T00:00:00.000Z" }
//! ```
//!
//! The `type` string selects the payload shape and the listeners that are
//! notified. Types this build does not know are kept as
//! [`MessageType::Other`] and only reach wildcard listeners.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::entity::EntityKind;
use crate::domain::foundation::Timestamp;

/// Close code for an intentional, clean shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the connection drops without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Discriminator of a realtime frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// `<kind>_created`
    Created(EntityKind),
    /// `<kind>_updated`
    Updated(EntityKind),
    /// `<kind>_deleted`
    Deleted(EntityKind),
    /// `stats_update`
    StatsUpdate,
    /// Keep-alive sent by the client.
    Ping,
    /// Keep-alive answer from the server.
    Pong,
    /// Server greeting after the token was accepted.
    Connected,
    /// Anything else; delivered to wildcard listeners only.
    Other(String),
}

impl MessageType {
    /// The wire name of this type.
    pub fn as_wire(&self) -> String {
        match self {
            MessageType::Created(kind) => format!("{}_created", kind),
            MessageType::Updated(kind) => format!("{}_updated", kind),
            MessageType::Deleted(kind) => format!("{}_deleted", kind),
            MessageType::StatsUpdate => "stats_update".to_string(),
            MessageType::Ping => "ping".to_string(),
            MessageType::Pong => "pong".to_string(),
            MessageType::Connected => "connected".to_string(),
            MessageType::Other(name) => name.clone(),
        }
    }

    /// Parses a wire name. Never fails: unknown names become `Other`.
    pub fn parse(name: &str) -> Self {
        match name {
            "stats_update" => return MessageType::StatsUpdate,
            "ping" => return MessageType::Ping,
            "pong" => return MessageType::Pong,
            "connected" => return MessageType::Connected,
            _ => {}
        }

        let entity_event = name.rsplit_once('_').and_then(|(kind, action)| {
            let kind = kind.parse::<EntityKind>().ok()?;
            match action {
                "created" => Some(MessageType::Created(kind)),
                "updated" => Some(MessageType::Updated(kind)),
                "deleted" => Some(MessageType::Deleted(kind)),
                _ => None,
            }
        });

        entity_event.unwrap_or_else(|| MessageType::Other(name.to_string()))
    }

    /// The entity kind an entity mutation event refers to.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            MessageType::Created(kind) | MessageType::Updated(kind) | MessageType::Deleted(kind) => {
                Some(*kind)
            }
            _ => None,
        }
    }
}

impl From<String> for MessageType {
    fn from(name: String) -> Self {
        MessageType::parse(&name)
    }
}

impl From<MessageType> for String {
    fn from(message_type: MessageType) -> Self {
        message_type.as_wire()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// A single realtime frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl TransportMessage {
    /// Creates a message stamped with the current time.
    pub fn new(message_type: MessageType, data: Value) -> Self {
        Self {
            message_type,
            data,
            timestamp: Some(Timestamp::now()),
        }
    }

    /// The keep-alive frame: exactly `{"type":"ping"}`.
    pub fn ping() -> Self {
        Self {
            message_type: MessageType::Ping,
            data: Value::Null,
            timestamp: None,
        }
    }

    /// Parses a text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serializes to a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Where a listener is registered: one message type, or every message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerChannel {
    /// The `"all"` wildcard channel.
    All,
    Type(MessageType),
}

impl From<MessageType> for ListenerChannel {
    fn from(message_type: MessageType) -> Self {
        ListenerChannel::Type(message_type)
    }
}

impl fmt::Display for ListenerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerChannel::All => write!(f, "all"),
            ListenerChannel::Type(message_type) => write!(f, "{}", message_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_entity_events() {
        assert_eq!(
            MessageType::parse("client_created"),
            MessageType::Created(EntityKind::Client)
        );
        assert_eq!(
            MessageType::parse("task_updated"),
            MessageType::Updated(EntityKind::Task)
        );
        assert_eq!(
            MessageType::parse("notification_deleted"),
            MessageType::Deleted(EntityKind::Notification)
        );
    }

    #[test]
    fn unknown_types_are_kept_as_other() {
        assert_eq!(
            MessageType::parse("visa_expired"),
            MessageType::Other("visa_expired".to_string())
        );
        assert_eq!(
            MessageType::parse("client_archived"),
            MessageType::Other("client_archived".to_string())
        );
    }

    #[test]
    fn wire_names_roundtrip_for_known_types() {
        for kind in EntityKind::ALL {
            for message_type in [
                MessageType::Created(kind),
                MessageType::Updated(kind),
                MessageType::Deleted(kind),
            ] {
                assert_eq!(MessageType::parse(&message_type.as_wire()), message_type);
            }
        }
        assert_eq!(MessageType::parse("stats_update"), MessageType::StatsUpdate);
    }

    #[test]
    fn ping_serializes_to_bare_type() {
        let json = TransportMessage::ping().to_json().unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn deserializes_frame_with_timestamp() {
        let message = TransportMessage::from_json(
            r#"{"type":"client_deleted","data":{"clientId":1},"timestamp":"2025-01-10T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(message.message_type, MessageType::Deleted(EntityKind::Client));
        assert_eq!(message.data, json!({"clientId": 1}));
        assert!(message.timestamp.is_some());
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let message = TransportMessage::from_json(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(message.message_type, MessageType::Pong);
        assert!(message.data.is_null());
    }

    #[test]
    fn frame_without_type_is_rejected() {
        assert!(TransportMessage::from_json(r#"{"data":{}}"#).is_err());
        assert!(TransportMessage::from_json("not json").is_err());
    }

    #[test]
    fn entity_kind_only_for_mutations() {
        assert_eq!(
            MessageType::Updated(EntityKind::Commission).entity_kind(),
            Some(EntityKind::Commission)
        );
        assert_eq!(MessageType::StatsUpdate.entity_kind(), None);
    }

    #[test]
    fn listener_channel_display() {
        assert_eq!(ListenerChannel::All.to_string(), "all");
        assert_eq!(
            ListenerChannel::from(MessageType::Created(EntityKind::Task)).to_string(),
            "task_created"
        );
    }
}
