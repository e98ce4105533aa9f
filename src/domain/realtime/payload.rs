//! Typed views over the `data` field of realtime frames.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::entity::EntityKind;
use crate::domain::foundation::{DomainError, EntityId, ErrorCode, OwnerScope};

/// Decodes the record carried by a `<kind>_created` / `<kind>_updated` frame.
pub fn decode_entity<T: DeserializeOwned>(kind: EntityKind, data: &Value) -> Result<T, DomainError> {
    serde_json::from_value(data.clone()).map_err(|e| {
        DomainError::new(
            ErrorCode::MalformedMessage,
            format!("invalid {} payload: {}", kind, e),
        )
    })
}

/// Payload of a `<kind>_deleted` frame.
///
/// The ID is read from the kind-specific field (`clientId`) and falls back
/// to `id`. The owner scope is optional on the wire; when it is missing the
/// consumer resolves it from local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePayload {
    pub id: EntityId,
    pub owner: Option<OwnerScope>,
}

impl DeletePayload {
    pub fn from_data(kind: EntityKind, data: &Value) -> Result<Self, DomainError> {
        let id = data
            .get(kind.id_field())
            .or_else(|| data.get("id"))
            .and_then(EntityId::from_json)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MalformedMessage,
                    format!("{}_deleted payload has no usable id", kind),
                )
            })?;

        let owner = data
            .get("agencyId")
            .and_then(Value::as_str)
            .and_then(|scope| OwnerScope::new(scope).ok());

        Ok(Self { id, owner })
    }
}

/// Payload of a `stats_update` frame.
///
/// An optional `entity` field names the kind the counters belong to; it is
/// stripped from the counters. Without it the update applies to every
/// stats consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPayload {
    pub entity: Option<EntityKind>,
    pub owner: Option<OwnerScope>,
    pub fields: Map<String, Value>,
}

impl StatsPayload {
    pub fn from_data(data: &Value) -> Result<Self, DomainError> {
        let mut fields = data.as_object().cloned().ok_or_else(|| {
            DomainError::new(ErrorCode::MalformedMessage, "stats_update payload is not an object")
        })?;

        let entity = match fields.remove("entity") {
            Some(Value::String(name)) => Some(name.parse::<EntityKind>().map_err(DomainError::from)?),
            Some(_) => {
                return Err(DomainError::new(
                    ErrorCode::MalformedMessage,
                    "stats_update entity must be a string",
                ))
            }
            None => None,
        };

        let owner = match fields.remove("agencyId") {
            Some(Value::String(scope)) => OwnerScope::new(scope).ok(),
            _ => None,
        };

        Ok(Self { entity, owner, fields })
    }

    /// Whether this update targets stats of `kind`.
    pub fn applies_to(&self, kind: EntityKind) -> bool {
        self.entity.map_or(true, |entity| entity == kind)
    }
}
