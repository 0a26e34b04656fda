use crate::error::{AppError, AppResult as Result};
use crate::notification::{InAppNotification, NotificationRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::cmp::Reverse;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    by_id: DashMap<Uuid, InAppNotification>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn store(&self, notification: &InAppNotification) -> Result<()> {
        self.by_id.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InAppNotification>> {
        Ok(self.by_id.get(&id).map(|n| n.value().clone()))
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InAppNotification>> {
        let mut items: Vec<InAppNotification> = self
            .by_id
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.value().clone())
            .collect();
        items.sort_by_key(|n| Reverse((n.created_at, n.id)));

        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn mark_as_read(&self, id: Uuid) -> Result<()> {
        let mut entry = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("notification {id}")))?;
        entry.mark_read(Utc::now());
        Ok(())
    }

    async fn mark_all_as_read(&self, user_id: Uuid) -> Result<u64> {
        let now = Utc::now();
        let mut updated = 0;
        for mut entry in self.by_id.iter_mut() {
            if entry.user_id == user_id && !entry.read {
                entry.mark_read(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        Ok(self
            .by_id
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }
}
