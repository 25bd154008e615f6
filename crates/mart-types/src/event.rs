//! Wire types for the ER change-event stream (spec §6). The core receives
//! a `(kind, entityId)` stream; this models the concrete JSON payload shape
//! the external transport delivers, and the durable queue row each payload
//! lives in while awaiting a refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of `AFFECTED_ENTITIES` in the event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedEntity {
    #[serde(rename = "ENTITY_ID")]
    pub entity_id: i64,
}

/// The JSON object the external transport delivers per spec §6. Unknown
/// fields are ignored by `serde`'s default (non-`deny_unknown_fields`)
/// behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEventPayload {
    #[serde(rename = "DATA_SOURCE")]
    pub data_source: String,
    #[serde(rename = "RECORD_ID")]
    pub record_id: String,
    #[serde(rename = "AFFECTED_ENTITIES")]
    pub affected_entities: Vec<AffectedEntity>,
}

impl ChangeEventPayload {
    /// The entity IDs this event should trigger a refresh for.
    pub fn entity_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.affected_entities.iter().map(|a| a.entity_id)
    }
}

/// A durable pending-event row (spec §3 "Pending-event record").
///
/// `lease_id`/`lease_expires_at` are `None` while the event is unleased;
/// both are set atomically by `leaseBatch` and cleared by the sweeper when
/// the lease expires without an ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEventRow {
    pub id: i64,
    pub lease_id: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_event_payload_ignores_unknown_fields() {
        let json = r#"{
            "DATA_SOURCE": "FOO",
            "RECORD_ID": "1",
            "AFFECTED_ENTITIES": [{"ENTITY_ID": 1}, {"ENTITY_ID": 2}],
            "SOMETHING_ELSE": "ignored"
        }"#;
        let payload: ChangeEventPayload = serde_json::from_str(json).expect("should parse");
        assert_eq!(payload.entity_ids().collect::<Vec<_>>(), vec![1, 2]);
    }
}
