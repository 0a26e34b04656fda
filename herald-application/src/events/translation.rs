use super::TRANSLATION_CREATED;
use herald_domain::domain_event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationCreatedPayload {
    pub translation_id: Uuid,
    pub user_id: Uuid,
    pub source: String,
    pub destination: String,
    pub original: String,
    pub translation: String,
}

/// 翻译完成事件
#[derive(Debug, Clone)]
pub struct TranslationCreated {
    meta: EventMetadata,
    payload: TranslationCreatedPayload,
}

impl TranslationCreated {
    pub fn new(payload: TranslationCreatedPayload) -> Self {
        Self {
            meta: EventMetadata::new(
                TRANSLATION_CREATED,
                "translation",
                payload.translation_id.to_string(),
            ),
            payload,
        }
    }
}

impl DomainEvent for TranslationCreated {
    type Payload = TranslationCreatedPayload;

    fn metadata(&self) -> &EventMetadata {
        &self.meta
    }

    fn payload(&self) -> &Self::Payload {
        &self.payload
    }
}
