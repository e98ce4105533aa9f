//! Notification record - in-app alerts for agency staff.

use serde::{Deserialize, Serialize};

use super::{EntityKind, EntityRecord};
use crate::domain::foundation::{EntityId, OwnerScope, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: EntityId,
    pub agency_id: OwnerScope,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}

impl EntityRecord for Notification {
    const KIND: EntityKind = EntityKind::Notification;

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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_defaults_to_unread() {
        let notification: Notification = serde_json::from_value(json!({
            "id": 5,
            "agencyId": "agency-1",
            "title": "Visa approved",
            "message": "Student visa for client 1 approved",
            "createdAt": "2025-01-10T00:00:00Z",
            "updatedAt": "2025-01-10T00:00:00Z"
        }))
        .unwrap();

        assert!(notification.is_unread());
        assert_eq!(Notification::KIND, EntityKind::Notification);
    }
}
