//! 事件投递（Eventing）
//!
//! 提供 Outbox → 总线 → 处理器 的完整链路：
//! - 总线端口：`EventPublisher`/`EventSubscriber`，以及内存与 AMQP 实现；
//! - `OutboxWorker`：周期拉取 Outbox 并逐条发布，失败隔离、重试上限后原地放弃；
//! - `EventConsumer`：订阅总线、按事件类型路由到 `EventHandler`，处理后确认；
//! - `TaskHandle`：长驻任务的关闭与等待句柄。
//!
#[cfg(feature = "amqp")]
mod amqp;
mod bus;
mod bus_inmemory;
mod consumer;
mod handle;
mod handler;
mod worker;

#[cfg(feature = "amqp")]
pub use amqp::{AmqpPublisher, AmqpSubscriber};
pub use bus::{Acknowledge, BusEvent, Delivery, EventPublisher, EventSubscriber};
pub use bus_inmemory::{InMemoryEventBus, topic_matches};
pub use consumer::EventConsumer;
pub use handle::TaskHandle;
pub use handler::{EventHandler, HandledEventType, HandlerRegistry};
pub use worker::{DispatchOutcome, OutboxWorker, OutboxWorkerConfig, TickReport};
