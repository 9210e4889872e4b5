//! Account lifecycle events.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use warden_core::UserId;

use crate::EventEnvelope;

/// Event type string of [`AccountEvent::Deleted`].
pub const USER_DELETED: &str = "user.deleted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountEvent {
    /// An account was removed (by its owner or by an admin).
    Deleted {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

impl AccountEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Deleted { .. } => USER_DELETED,
        }
    }

    /// Wrap the event for publication, stamped with the current time.
    pub fn into_envelope(self) -> EventEnvelope<AccountEvent> {
        EventEnvelope::new(self.event_type(), Utc::now(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_event_wire_shape() {
        let json = serde_json::to_value(AccountEvent::Deleted { user_id: UserId::new(13) }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "deleted", "userId": 13 }));
    }

    #[test]
    fn envelope_carries_event_type() {
        let env = AccountEvent::Deleted { user_id: UserId::new(1) }.into_envelope();
        assert_eq!(env.event_type(), USER_DELETED);
        assert_eq!(env.payload(), &AccountEvent::Deleted { user_id: UserId::new(1) });
    }
}
