//! 站内信收件箱用例
//!
use crate::error::{AppError, AppResult as Result};
use crate::notification::{InAppNotification, NotificationRepository};
use std::sync::Arc;
use uuid::Uuid;

/// 单页上限
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct InAppInbox {
    repo: Arc<dyn NotificationRepository>,
}

impl InAppInbox {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, notification: &InAppNotification) -> Result<()> {
        if notification.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        self.repo.store(notification).await
    }

    pub async fn get(&self, id: Uuid) -> Result<InAppNotification> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("notification {id}")))
    }

    /// 最新的在前；`limit` 为 0 时返回空，超过上限时截断
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InAppNotification>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.repo
            .find_by_user(user_id, limit.min(MAX_PAGE_SIZE), offset)
            .await
    }

    pub async fn mark_as_read(&self, id: Uuid) -> Result<()> {
        self.repo.mark_as_read(id).await
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) -> Result<u64> {
        self.repo.mark_all_as_read(user_id).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        self.repo.unread_count(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryNotificationRepository;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    fn notification(user_id: Uuid, title: &str, minutes_ago: i64) -> InAppNotification {
        InAppNotification {
            id: Uuid::now_v7(),
            user_id,
            kind: "test".into(),
            title: title.into(),
            body: "body".into(),
            data: BTreeMap::new(),
            action_url: None,
            image_url: None,
            read: false,
            read_at: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_paging() {
        let inbox = InAppInbox::new(Arc::new(InMemoryNotificationRepository::new()));
        let user = Uuid::now_v7();
        for (title, ago) in [("old", 30), ("mid", 20), ("new", 10)] {
            inbox.create(&notification(user, title, ago)).await.unwrap();
        }
        inbox
            .create(&notification(Uuid::now_v7(), "other user", 1))
            .await
            .unwrap();

        let first = inbox.list_for_user(user, 2, 0).await.unwrap();
        assert_eq!(
            first.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
            vec!["new", "mid"]
        );
        let second = inbox.list_for_user(user, 2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "old");
        assert!(inbox.list_for_user(user, 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_tracking_updates_unread_count() {
        let inbox = InAppInbox::new(Arc::new(InMemoryNotificationRepository::new()));
        let user = Uuid::now_v7();
        let a = notification(user, "a", 3);
        let b = notification(user, "b", 2);
        let c = notification(user, "c", 1);
        for n in [&a, &b, &c] {
            inbox.create(n).await.unwrap();
        }

        inbox.mark_as_read(a.id).await.unwrap();
        assert_eq!(inbox.unread_count(user).await.unwrap(), 2);
        assert!(inbox.get(a.id).await.unwrap().read_at.is_some());

        assert_eq!(inbox.mark_all_as_read(user).await.unwrap(), 2);
        assert_eq!(inbox.unread_count(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_notification_is_not_found() {
        let inbox = InAppInbox::new(Arc::new(InMemoryNotificationRepository::new()));
        assert!(matches!(
            inbox.get(Uuid::now_v7()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            inbox.mark_as_read(Uuid::now_v7()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let inbox = InAppInbox::new(Arc::new(InMemoryNotificationRepository::new()));
        let n = notification(Uuid::now_v7(), "  ", 0);
        assert!(matches!(
            inbox.create(&n).await,
            Err(AppError::Validation(_))
        ));
    }
}
