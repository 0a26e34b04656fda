use crate::error::AppResult as Result;
use crate::notification::{DeliveryLog, DeliveryLogRepository};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryDeliveryLogRepository {
    by_id: DashMap<Uuid, DeliveryLog>,
}

impl InMemoryDeliveryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部日志，按创建时间排序
    pub fn all(&self) -> Vec<DeliveryLog> {
        let mut logs: Vec<DeliveryLog> = self.by_id.iter().map(|l| l.value().clone()).collect();
        logs.sort_by_key(|l| (l.created_at, l.id));
        logs
    }
}

#[async_trait]
impl DeliveryLogRepository for InMemoryDeliveryLogRepository {
    async fn store(&self, log: &DeliveryLog) -> Result<()> {
        self.by_id.insert(log.id, log.clone());
        Ok(())
    }

    async fn find_by_notification(&self, notification_id: Uuid) -> Result<Vec<DeliveryLog>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|l| l.notification_id == Some(notification_id))
            .collect())
    }
}
