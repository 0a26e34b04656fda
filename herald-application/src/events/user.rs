use super::USER_CREATED;
use herald_domain::domain_event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreatedPayload {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 用户注册事件
#[derive(Debug, Clone)]
pub struct UserCreated {
    meta: EventMetadata,
    payload: UserCreatedPayload,
}

impl UserCreated {
    pub fn new(payload: UserCreatedPayload) -> Self {
        Self {
            meta: EventMetadata::new(USER_CREATED, "user", payload.user_id.to_string()),
            payload,
        }
    }
}

impl DomainEvent for UserCreated {
    type Payload = UserCreatedPayload;

    fn metadata(&self) -> &EventMetadata {
        &self.meta
    }

    fn payload(&self) -> &Self::Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_domain::outbox::OutboxEvent;

    #[test]
    fn converts_into_an_outbox_row_routed_by_type() {
        let user_id = Uuid::now_v7();
        let ev = UserCreated::new(UserCreatedPayload {
            user_id,
            email: "test@example.com".into(),
            name: None,
        });

        let row = OutboxEvent::from_domain_event(&ev).unwrap();

        assert_eq!(row.event_type(), USER_CREATED);
        assert_eq!(row.aggregate_type(), "user");
        assert_eq!(row.aggregate_id(), user_id.to_string());
        let back: UserCreatedPayload = serde_json::from_slice(row.payload()).unwrap();
        assert_eq!(back.email, "test@example.com");
    }
}
