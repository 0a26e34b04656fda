//! 事件消费任务（EventConsumer）
//!
//! 订阅一个或多个主题，按 `HandledEventType` 将每条投递路由到匹配的处理器：
//! - 同一条投递的处理器依次执行，全部结束后再确认（自然形成背压）；
//! - 未知事件类型只记录日志并确认；
//! - 处理器失败只记录日志，投递仍被确认；
//! - 取消在两条投递之间生效。
//!
use crate::error::DomainResult as Result;
use crate::eventing::{Delivery, EventHandler, EventSubscriber, HandlerRegistry, TaskHandle};
use bon::Builder;
use futures_util::{StreamExt, stream};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::event_consumer_builder::{IsUnset, SetRegistry, State as BuilderState};

#[derive(Builder)]
pub struct EventConsumer {
    subscriber: Arc<dyn EventSubscriber>,
    #[builder(setters(vis = "pub(crate)"))]
    registry: HandlerRegistry,
    /// 订阅的主题（主题 `t` 绑定 `t.#`）
    topics: Vec<String>,
}

impl<S: BuilderState> EventConsumerBuilder<S> {
    pub fn event_handlers(
        self,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> EventConsumerBuilder<SetRegistry<S>>
    where
        <S as BuilderState>::Registry: IsUnset,
    {
        self.registry(HandlerRegistry::new(handlers))
    }
}

impl EventConsumer {
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// 订阅全部主题后启动消费任务；任一订阅失败立即返回错误
    pub async fn spawn(self: Arc<Self>, token: CancellationToken) -> Result<TaskHandle> {
        let mut streams = Vec::with_capacity(self.topics.len());
        for topic in &self.topics {
            streams.push(self.subscriber.subscribe(topic).await?);
        }

        let token = token.child_token();
        let loop_token = token.clone();
        let task = tokio::spawn(async move {
            let mut deliveries = stream::select_all(streams);
            tracing::info!(topics = ?self.topics, "event consumer started");

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    next = deliveries.next() => match next {
                        Some(delivery) => self.process(delivery).await,
                        None => {
                            tracing::info!("subscription streams ended");
                            break;
                        }
                    }
                }
            }

            tracing::info!("event consumer stopped");
        });

        Ok(TaskHandle::new(token, vec![task]))
    }

    /// 处理单条投递并确认
    pub async fn process(&self, delivery: Delivery) {
        let event = delivery.event();
        let handlers = self.registry.matching(&event.event_type);

        if handlers.is_empty() {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "unhandled event type"
            );
        }

        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::error!(
                    handler = handler.handler_name(),
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "event handler failed"
                );
            }
        }

        delivery.ack().await;
    }
}
