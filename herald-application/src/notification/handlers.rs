//! 事件 → 通知 的映射处理器
//!
//! 载荷无法解析的事件只记录日志后丢弃并返回成功；
//! 渠道发送失败以 `EventHandler` 错误返回，由消费循环记录。
//!
use crate::events::{
    TRANSLATION_CREATED, TranslationCreatedPayload, USER_CREATED, UserCreatedPayload,
};
use crate::notification::{EmailMessage, InAppMessage, NotificationService};
use async_trait::async_trait;
use herald_domain::error::{DomainError, DomainResult};
use herald_domain::eventing::{BusEvent, EventHandler, HandledEventType};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

fn decode<T: DeserializeOwned>(handler: &str, event: &BusEvent) -> Option<T> {
    match serde_json::from_slice(&event.payload) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!(
                handler,
                event_id = %event.id,
                event_type = %event.event_type,
                error = %e,
                "malformed event payload, dropping"
            );
            None
        }
    }
}

fn handler_error(handler: &str, reasons: Vec<String>) -> DomainError {
    DomainError::EventHandler {
        handler: handler.to_string(),
        reason: reasons.join("; "),
    }
}

/// `translation.created` → 站内信“Translation Complete”
pub struct TranslationCreatedHandler {
    service: Arc<NotificationService>,
}

impl TranslationCreatedHandler {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for TranslationCreatedHandler {
    fn handler_name(&self) -> &str {
        "translation_created_notifier"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One(TRANSLATION_CREATED.to_string())
    }

    async fn handle(&self, event: &BusEvent) -> DomainResult<()> {
        let Some(payload) = decode::<TranslationCreatedPayload>(self.handler_name(), event) else {
            return Ok(());
        };

        let msg = InAppMessage::builder()
            .user_id(payload.user_id)
            .kind("translation_completed")
            .title("Translation Complete")
            .body(format!(
                "Your translation from {} to {} is ready",
                payload.source, payload.destination
            ))
            .data(BTreeMap::from([(
                "translation_id".to_string(),
                payload.translation_id.to_string(),
            )]))
            .build();

        self.service
            .send_in_app(&msg)
            .await
            .map(|_| ())
            .map_err(|e| handler_error(self.handler_name(), vec![e.to_string()]))
    }
}

/// `user.created` → 站内欢迎信 + 欢迎邮件，两个渠道互不影响
pub struct UserCreatedHandler {
    service: Arc<NotificationService>,
}

impl UserCreatedHandler {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for UserCreatedHandler {
    fn handler_name(&self) -> &str {
        "user_created_notifier"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One(USER_CREATED.to_string())
    }

    async fn handle(&self, event: &BusEvent) -> DomainResult<()> {
        let Some(payload) = decode::<UserCreatedPayload>(self.handler_name(), event) else {
            return Ok(());
        };

        let greeting = match payload.name.as_deref() {
            Some(name) if !name.is_empty() => format!("Hi {name}, welcome aboard!"),
            _ => "Welcome aboard!".to_string(),
        };
        let mut failures = Vec::new();

        let in_app = InAppMessage::builder()
            .user_id(payload.user_id)
            .kind("welcome")
            .title("Welcome")
            .body(greeting.clone())
            .build();
        if let Err(e) = self.service.send_in_app(&in_app).await {
            failures.push(format!("in_app: {e}"));
        }

        let email = EmailMessage::builder()
            .user_id(payload.user_id)
            .to(vec![payload.email.clone()])
            .subject("Welcome")
            .body(format!(
                "{greeting}\n\nYour account is ready. You will receive notifications here."
            ))
            .build();
        if let Err(e) = self.service.send_email(&email).await {
            failures.push(format!("email: {e}"));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(handler_error(self.handler_name(), failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::inmemory::{
        InMemoryDeliveryLogRepository, InMemoryNotificationRepository,
        InMemoryPreferencesRepository, InMemoryPushTokenRepository,
    };
    use crate::notification::{EmailSender, NotificationRepository};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingEmail {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingEmail {
        fn provider(&self) -> &str {
            "recording"
        }
        async fn send(&self, msg: &EmailMessage) -> AppResult<Option<String>> {
            if self.fail {
                return Err(AppError::provider("recording", "smtp down"));
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(Some("msg-1".into()))
        }
    }

    fn service(
        notifications: Arc<InMemoryNotificationRepository>,
        email: Arc<RecordingEmail>,
    ) -> Arc<NotificationService> {
        Arc::new(
            NotificationService::builder()
                .notifications(notifications)
                .preferences(Arc::new(InMemoryPreferencesRepository::new()))
                .push_tokens(Arc::new(InMemoryPushTokenRepository::new()))
                .delivery_logs(Arc::new(InMemoryDeliveryLogRepository::new()))
                .email_sender(email)
                .build(),
        )
    }

    fn bus_event(event_type: &str, payload: &impl serde::Serialize) -> BusEvent {
        BusEvent {
            id: Uuid::now_v7().to_string(),
            event_type: event_type.to_string(),
            payload: serde_json::to_vec(payload).unwrap(),
        }
    }

    #[tokio::test]
    async fn translation_created_becomes_an_in_app_notification() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let handler = TranslationCreatedHandler::new(service(repo.clone(), Arc::default()));
        let user_id = Uuid::now_v7();
        let translation_id = Uuid::now_v7();

        handler
            .handle(&bus_event(
                TRANSLATION_CREATED,
                &TranslationCreatedPayload {
                    translation_id,
                    user_id,
                    source: "en".into(),
                    destination: "de".into(),
                    original: "hello".into(),
                    translation: "hallo".into(),
                },
            ))
            .await
            .unwrap();

        let stored = repo.find_by_user(user_id, 10, 0).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Translation Complete");
        assert_eq!(stored[0].body, "Your translation from en to de is ready");
        assert_eq!(stored[0].kind, "translation_completed");
        assert_eq!(
            stored[0].data.get("translation_id"),
            Some(&translation_id.to_string())
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_error() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let handler = TranslationCreatedHandler::new(service(repo.clone(), Arc::default()));

        let event = BusEvent {
            id: "e-1".into(),
            event_type: TRANSLATION_CREATED.into(),
            payload: b"not json".to_vec(),
        };

        assert!(handler.handle(&event).await.is_ok());
    }

    #[tokio::test]
    async fn user_created_sends_in_app_and_email() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let email = Arc::new(RecordingEmail::default());
        let handler = UserCreatedHandler::new(service(repo.clone(), email.clone()));
        let user_id = Uuid::now_v7();

        handler
            .handle(&bus_event(
                USER_CREATED,
                &UserCreatedPayload {
                    user_id,
                    email: "new@example.com".into(),
                    name: Some("Ada".into()),
                },
            ))
            .await
            .unwrap();

        assert_eq!(repo.unread_count(user_id).await.unwrap(), 1);
        let sent = email.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["new@example.com".to_string()]);
        assert!(sent[0].body.starts_with("Hi Ada"));
    }

    #[tokio::test]
    async fn email_failure_does_not_block_the_in_app_notification() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let email = Arc::new(RecordingEmail {
            fail: true,
            ..Default::default()
        });
        let handler = UserCreatedHandler::new(service(repo.clone(), email));
        let user_id = Uuid::now_v7();

        let err = handler
            .handle(&bus_event(
                USER_CREATED,
                &UserCreatedPayload {
                    user_id,
                    email: "new@example.com".into(),
                    name: None,
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::EventHandler { .. }));
        assert_eq!(repo.unread_count(user_id).await.unwrap(), 1);
    }
}
