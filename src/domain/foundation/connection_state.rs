//! Connection lifecycle states.
//!
//! Two related machines live here:
//!
//! - [`ConnectionState`] mirrors the transport's readiness and is driven
//!   solely by transport lifecycle callbacks.
//! - [`SyncStatus`] is the coarser, UI-facing status published by the
//!   synchronization controller (Live / Connecting / Offline).
//!
//! ```text
//! ConnectionState:
//!   Disconnected ──connect──▶ Connecting ──open──▶ Connected
//!        ▲                        │                  │
//!        └────────error───────────┘                  │ disconnect()
//!        ▲                                           ▼
//!        └──────────────close─────────────────── Closing
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StateMachine;

/// Readiness of the realtime transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionState {
    /// Returns true while a connection is being opened or is open.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl StateMachine for ConnectionState {
    fn successors(&self) -> &'static [Self] {
        use ConnectionState::*;
        match self {
            Disconnected => &[Connecting],
            Connecting => &[Connected, Disconnected],
            Connected => &[Closing, Disconnected],
            Closing => &[Disconnected],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Closing => "CLOSING",
        };
        write!(f, "{}", s)
    }
}

/// Connection status as seen by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl SyncStatus {
    /// Label rendered by the Live/Offline indicator.
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Disconnected => "Offline",
            SyncStatus::Connecting => "Connecting",
            SyncStatus::Connected => "Live",
        }
    }
}

impl StateMachine for SyncStatus {
    fn successors(&self) -> &'static [Self] {
        use SyncStatus::*;
        match self {
            Disconnected => &[Connecting],
            Connecting => &[Connected, Disconnected],
            Connected => &[Disconnected],
        }
    }
}

impl From<ConnectionState> for SyncStatus {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connecting => SyncStatus::Connecting,
            ConnectionState::Connected => SyncStatus::Connected,
            ConnectionState::Disconnected | ConnectionState::Closing => SyncStatus::Disconnected,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
