//! 通知相关仓储协议
//!
use crate::error::AppResult as Result;
use crate::notification::{DeliveryLog, InAppNotification, PushToken, UserPreferences};
use async_trait::async_trait;
use uuid::Uuid;

/// 站内信仓储
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn store(&self, notification: &InAppNotification) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InAppNotification>>;

    /// 按创建时间倒序分页
    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InAppNotification>>;

    /// 标记已读；不存在时返回 `NotFound`
    async fn mark_as_read(&self, id: Uuid) -> Result<()>;

    /// 标记该用户全部未读为已读，返回受影响条数
    async fn mark_all_as_read(&self, user_id: Uuid) -> Result<u64>;

    async fn unread_count(&self, user_id: Uuid) -> Result<u64>;
}

/// 偏好仓储（每用户一行，upsert 语义）
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserPreferences>>;

    async fn upsert(&self, prefs: &UserPreferences) -> Result<()>;
}

/// 推送令牌仓储
#[async_trait]
pub trait PushTokenRepository: Send + Sync {
    /// 按令牌 upsert：已存在时更新归属、平台、设备与激活状态
    async fn store(&self, token: &PushToken) -> Result<()>;

    /// 用户的全部令牌（含未激活）
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<PushToken>>;

    async fn deactivate(&self, token: &str) -> Result<()>;

    async fn delete(&self, token: &str) -> Result<()>;

    async fn delete_by_user(&self, user_id: Uuid) -> Result<()>;
}

/// 投递日志仓储（只追加）
#[async_trait]
pub trait DeliveryLogRepository: Send + Sync {
    async fn store(&self, log: &DeliveryLog) -> Result<()>;

    async fn find_by_notification(&self, notification_id: Uuid) -> Result<Vec<DeliveryLog>>;
}
