//! 消息总线（Message Bus）端口
//!
//! 发布与订阅拆分为两个窄接口：
//! - `EventPublisher`：按事件类型作为路由键发布，消息 ID 等于事件 ID；
//! - `EventSubscriber`：按主题订阅，返回 'static 生命周期的 `Delivery` 流，
//!   便于在 `tokio::spawn` 中消费。
//!
//! 交换机/队列的声明由适配器在构造时完成，失败即返回错误。
//!
use crate::best_effort::best_effort;
use crate::error::DomainResult as Result;
use crate::outbox::OutboxEvent;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::fmt;

/// 总线上传输的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEvent {
    pub id: String,
    pub event_type: String,
    pub payload: Vec<u8>,
}

impl From<&OutboxEvent> for BusEvent {
    fn from(ev: &OutboxEvent) -> Self {
        Self {
            id: ev.id().to_string(),
            event_type: ev.event_type().to_string(),
            payload: ev.payload().to_vec(),
        }
    }
}

/// 消息确认能力（由具体适配器提供）
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(&self) -> Result<()>;
}

/// 一次投递：事件本身加上可选的确认器
pub struct Delivery {
    event: BusEvent,
    acker: Option<Box<dyn Acknowledge>>,
}

impl Delivery {
    /// 无需确认的投递
    pub fn new(event: BusEvent) -> Self {
        Self { event, acker: None }
    }

    pub fn with_acker(event: BusEvent, acker: Box<dyn Acknowledge>) -> Self {
        Self {
            event,
            acker: Some(acker),
        }
    }

    pub fn event(&self) -> &BusEvent {
        &self.event
    }

    pub fn into_event(self) -> BusEvent {
        self.event
    }

    /// 尽力确认：失败只记录日志，未确认的消息由 broker 重投
    pub async fn ack(self) {
        if let Some(acker) = self.acker {
            best_effort("ack delivery", acker.ack()).await;
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("event", &self.event)
            .field("ackable", &self.acker.is_some())
            .finish()
    }
}

/// 发布端：实现需设置持久化投递、消息 ID 与路由键
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OutboxEvent) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// 订阅端：订阅主题 `t` 即绑定 `t.#`
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, Delivery>>;

    async fn close(&self) -> Result<()>;
}
