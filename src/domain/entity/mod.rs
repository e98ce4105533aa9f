//! Entity records synchronized by the realtime layer.
//!
//! Every record carries an [`EntityId`], a status enum, created/updated
//! timestamps and exactly one [`OwnerScope`]. The [`EntityRecord`] trait is
//! the seam the cache and the synchronization controller are generic over.

mod client;
mod commission;
mod notification;
mod query;
mod task;

pub use client::{Client, ClientStatus};
pub use commission::{Commission, CommissionStatus};
pub use notification::{Notification, NotificationStatus};
pub use query::{QueryFilters, StatsSnapshot};
pub use task::{Task, TaskPriority, TaskStatus};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::foundation::{EntityId, OwnerScope, Timestamp, ValidationError};

/// The kinds of records pushed over the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Task,
    Commission,
    Notification,
}

impl EntityKind {
    /// All kinds, in display order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Client,
        EntityKind::Task,
        EntityKind::Commission,
        EntityKind::Notification,
    ];

    /// Singular wire name (`client`), used in event types and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Task => "task",
            EntityKind::Commission => "commission",
            EntityKind::Notification => "notification",
        }
    }

    /// Plural REST collection name (`clients`).
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Client => "clients",
            EntityKind::Task => "tasks",
            EntityKind::Commission => "commissions",
            EntityKind::Notification => "notifications",
        }
    }

    /// Payload field naming the ID in delete events (`clientId`).
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Client => "clientId",
            EntityKind::Task => "taskId",
            EntityKind::Commission => "commissionId",
            EntityKind::Notification => "notificationId",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("entity_kind", format!("unknown kind '{}'", s))
            })
    }
}

/// A domain record that can be cached and synchronized.
///
/// # Example
///
/// ```ignore
/// impl EntityRecord for Client {
///     const KIND: EntityKind = EntityKind::Client;
///     fn entity_id(&self) -> EntityId { self.id.clone() }
///     fn owner_scope(&self) -> &OwnerScope { &self.agency_id }
///     fn updated_at(&self) -> Timestamp { self.updated_at }
/// }
/// ```
pub trait EntityRecord:
    Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Kind tag shared by every record of this type.
    const KIND: EntityKind;

    /// Stable identifier of the record.
    fn entity_id(&self) -> EntityId;

    /// The agency that owns the record.
    fn owner_scope(&self) -> &OwnerScope;

    /// Last modification time reported by the backend.
    fn updated_at(&self) -> Timestamp;

    /// Checks whether the record belongs to `scope`.
    fn is_owned_by(&self, scope: &OwnerScope) -> bool {
        self.owner_scope() == scope
    }
}
