//! Herald 领域层：事务发件箱与事件投递
//!
//! - `domain_event`：领域事件协议、元数据与事件集合；
//! - `outbox`：Outbox 事件模型与存储协议（内存/Postgres 实现）；
//! - `eventing`：总线端口（内存/AMQP 实现）、Outbox Worker、事件消费任务；
//! - `best_effort`：只记录不传播错误的旁路调用；
//! - `error`：统一错误类型。
//!
pub mod best_effort;
pub mod domain_event;
pub mod error;
pub mod eventing;
pub mod outbox;
