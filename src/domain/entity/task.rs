//! Task record - a unit of case work assigned to an agent.

use serde::{Deserialize, Serialize};

use super::{EntityKind, EntityRecord};
use crate::domain::foundation::{EntityId, OwnerScope, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A piece of work, optionally tied to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    pub agency_id: OwnerScope,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// True when the task is still open and its due date has passed.
    pub fn is_overdue(&self, now: &Timestamp) -> bool {
        let open = matches!(self.status, TaskStatus::Pending | TaskStatus::InProgress);
        open && self.due_date.map_or(false, |due| due.is_before(now))
    }
}

impl EntityRecord for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn entity_id(&self) -> EntityId {
        self.id.clone()
    }

    fn owner_scope(&self) -> &OwnerScope {
        &self.agency_id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}
