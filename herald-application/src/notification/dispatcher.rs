//! 通知分发任务：订阅总线并把事件交给通知处理器
//!
use crate::error::AppResult as Result;
use crate::notification::{NotificationService, TranslationCreatedHandler, UserCreatedHandler};
use herald_domain::eventing::{EventConsumer, EventHandler, EventSubscriber, TaskHandle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct NotificationDispatcher {
    service: Arc<NotificationService>,
}

impl NotificationDispatcher {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }

    /// 已注册的事件处理器
    pub fn handlers(&self) -> Vec<Arc<dyn EventHandler>> {
        vec![
            Arc::new(TranslationCreatedHandler::new(self.service.clone())),
            Arc::new(UserCreatedHandler::new(self.service.clone())),
        ]
    }

    /// 订阅 `topics` 并启动消费任务
    pub async fn spawn(
        &self,
        subscriber: Arc<dyn EventSubscriber>,
        topics: Vec<String>,
        token: CancellationToken,
    ) -> Result<TaskHandle> {
        let consumer = Arc::new(
            EventConsumer::builder()
                .subscriber(subscriber)
                .event_handlers(self.handlers())
                .topics(topics)
                .build(),
        );

        Ok(consumer.spawn(token).await?)
    }
}
