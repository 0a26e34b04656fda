//! Outbox（事务发件箱）
//!
//! 领域变更与 Outbox 行在同一事务内写入，之后由 `OutboxWorker` 异步发布到总线：
//! - `OutboxEvent`：可靠投递的最小单元，携带显式状态（pending/published/abandoned）；
//! - `OutboxStore`：Worker 消费的存储协议（拉取、标记成功/失败/放弃）；
//! - `InMemoryOutboxStore`：测试与本地开发用实现；
//! - `PgOutboxStore`：基于 sqlx 的 Postgres 实现（`postgres` 特性）。
//!
mod inmemory;
mod outbox_event;
#[cfg(feature = "postgres")]
mod postgres;
mod store;

pub use inmemory::InMemoryOutboxStore;
pub use outbox_event::{OutboxEvent, OutboxStatus};
#[cfg(feature = "postgres")]
pub use postgres::PgOutboxStore;
pub use store::OutboxStore;
