//! 内存版 Outbox 存储（InMemoryOutboxStore）
//!
//! 以 `tokio::sync::RwLock` 保护的向量保存全部行，满足 `OutboxStore` 协议，
//! 用于测试、示例与本地开发。
//!
use crate::error::{DomainError, DomainResult as Result};
use crate::outbox::{OutboxEvent, OutboxStatus, OutboxStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryOutboxStore {
    rows: RwLock<Vec<OutboxEvent>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按 ID 读取当前行（用于观察状态迁移）
    pub async fn get(&self, id: Uuid) -> Option<OutboxEvent> {
        self.rows.read().await.iter().find(|e| e.id() == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn fetch_by_status(&self, status: OutboxStatus, limit: i64) -> Vec<OutboxEvent> {
        if limit <= 0 {
            return Vec::new();
        }

        let rows = self.rows.read().await;
        let mut matched: Vec<OutboxEvent> = rows
            .iter()
            .filter(|e| e.status() == status)
            .cloned()
            .collect();
        // 稳定排序：创建时间相同时保持写入顺序
        matched.sort_by_key(|e| e.created_at());
        matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        matched
    }

    async fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut OutboxEvent) -> R) -> Result<R> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| DomainError::not_found(format!("outbox event {id}")))?;
        Ok(f(row))
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn store(&self, events: &[OutboxEvent]) -> Result<()> {
        let mut rows = self.rows.write().await;

        // 先整体校验，保证批次原子性
        let mut seen: HashSet<Uuid> = rows.iter().map(|e| e.id()).collect();
        for ev in events {
            if !seen.insert(ev.id()) {
                return Err(DomainError::outbox(format!(
                    "duplicate outbox event id {}",
                    ev.id()
                )));
            }
        }

        rows.extend(events.iter().cloned());
        Ok(())
    }

    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        Ok(self.fetch_by_status(OutboxStatus::Pending, limit).await)
    }

    async fn mark_published(&self, id: Uuid) -> Result<()> {
        self.update(id, |row| row.record_published(Utc::now())).await
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<u32> {
        self.update(id, |row| row.record_failure(reason)).await
    }

    async fn mark_abandoned(&self, id: Uuid) -> Result<()> {
        self.update(id, |row| row.record_abandoned()).await
    }

    async fn fetch_abandoned(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        Ok(self.fetch_by_status(OutboxStatus::Abandoned, limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn event_at(event_type: &str, created_at: DateTime<Utc>) -> OutboxEvent {
        OutboxEvent::builder()
            .aggregate_type("user")
            .aggregate_id("1")
            .event_type(event_type)
            .payload(b"{}".to_vec())
            .created_at(created_at)
            .build()
    }

    #[tokio::test]
    async fn fetch_returns_oldest_first_and_respects_limit() {
        let store = InMemoryOutboxStore::new();
        let now = Utc::now();
        let newer = event_at("user.updated", now);
        let older = event_at("user.created", now - Duration::seconds(10));
        store.store(&[newer.clone(), older.clone()]).await.unwrap();

        let all = store.fetch_unpublished(10).await.unwrap();
        assert_eq!(
            all.iter().map(|e| e.id()).collect::<Vec<_>>(),
            vec![older.id(), newer.id()]
        );

        let one = store.fetch_unpublished(1).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id(), older.id());
    }

    #[tokio::test]
    async fn non_positive_limit_yields_nothing() {
        let store = InMemoryOutboxStore::new();
        store
            .store(&[event_at("user.created", Utc::now())])
            .await
            .unwrap();

        assert!(store.fetch_unpublished(0).await.unwrap().is_empty());
        assert!(store.fetch_unpublished(-3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_is_all_or_nothing() {
        let store = InMemoryOutboxStore::new();
        let a = event_at("user.created", Utc::now());
        store.store(&[a.clone()]).await.unwrap();

        let b = event_at("user.updated", Utc::now());
        let err = store.store(&[b, a]).await.unwrap_err();
        assert!(matches!(err, DomainError::Outbox { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn mark_published_twice_keeps_first_timestamp() {
        let store = InMemoryOutboxStore::new();
        let ev = event_at("user.created", Utc::now());
        store.store(&[ev.clone()]).await.unwrap();

        store.mark_published(ev.id()).await.unwrap();
        let first = store.get(ev.id()).await.unwrap().published_at();
        assert!(first.is_some());

        store.mark_published(ev.id()).await.unwrap();
        let second = store.get(ev.id()).await.unwrap().published_at();
        assert_eq!(first, second);
        assert!(store.fetch_unpublished(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_failed_increments_without_touching_published_at() {
        let store = InMemoryOutboxStore::new();
        let ev = event_at("user.created", Utc::now());
        store.store(&[ev.clone()]).await.unwrap();

        assert_eq!(store.mark_failed(ev.id(), "network error").await.unwrap(), 1);
        assert_eq!(store.mark_failed(ev.id(), "broker down").await.unwrap(), 2);

        let row = store.get(ev.id()).await.unwrap();
        assert_eq!(row.retry_count(), 2);
        assert_eq!(row.last_error(), Some("broker down"));
        assert_eq!(row.published_at(), None);
        assert!(row.is_pending());
    }

    #[tokio::test]
    async fn abandoned_events_leave_the_pending_view_but_stay_queryable() {
        let store = InMemoryOutboxStore::new();
        let ev = event_at("user.created", Utc::now());
        store.store(&[ev.clone()]).await.unwrap();

        store.mark_abandoned(ev.id()).await.unwrap();

        assert!(store.fetch_unpublished(10).await.unwrap().is_empty());
        let dead = store.fetch_abandoned(10).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id(), ev.id());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = InMemoryOutboxStore::new();
        let err = store.mark_published(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
