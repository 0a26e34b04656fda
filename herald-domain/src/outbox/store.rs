//! Outbox 存储协议（OutboxStore）
//!
//! Worker 只依赖该协议；每个行级更新彼此独立，由底层存储保证原子性。
//!
use crate::error::DomainResult as Result;
use crate::outbox::OutboxEvent;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// 以批次为单位写入，要么全部成功要么全部失败
    async fn store(&self, events: &[OutboxEvent]) -> Result<()>;

    /// 拉取至多 `limit` 条待发布事件，按创建时间升序；`limit <= 0` 返回空
    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEvent>>;

    /// 标记为已发布；重复调用保持首次的发布时间
    async fn mark_published(&self, id: Uuid) -> Result<()>;

    /// 失败次数加一并覆盖失败原因，返回新的失败次数；不修改发布时间
    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<u32>;

    /// 标记为放弃（原地死信），行保留
    async fn mark_abandoned(&self, id: Uuid) -> Result<()>;

    /// 查看已放弃的事件，按创建时间升序
    async fn fetch_abandoned(&self, limit: i64) -> Result<Vec<OutboxEvent>>;
}

#[async_trait]
impl<T> OutboxStore for Arc<T>
where
    T: OutboxStore + ?Sized,
{
    async fn store(&self, events: &[OutboxEvent]) -> Result<()> {
        (**self).store(events).await
    }

    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        (**self).fetch_unpublished(limit).await
    }

    async fn mark_published(&self, id: Uuid) -> Result<()> {
        (**self).mark_published(id).await
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<u32> {
        (**self).mark_failed(id, reason).await
    }

    async fn mark_abandoned(&self, id: Uuid) -> Result<()> {
        (**self).mark_abandoned(id).await
    }

    async fn fetch_abandoned(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        (**self).fetch_abandoned(limit).await
    }
}
