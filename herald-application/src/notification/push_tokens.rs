//! 推送令牌管理用例
//!
use crate::error::{AppError, AppResult as Result};
use crate::notification::{Platform, PushToken, PushTokenRepository};
use std::sync::Arc;
use uuid::Uuid;

pub struct PushTokens {
    repo: Arc<dyn PushTokenRepository>,
}

impl PushTokens {
    pub fn new(repo: Arc<dyn PushTokenRepository>) -> Self {
        Self { repo }
    }

    /// 注册设备令牌；同一令牌重复注册会转移归属并重新激活
    pub async fn register(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Platform,
        device_id: &str,
    ) -> Result<PushToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("push token must not be empty".into()));
        }

        let push_token = PushToken::new(user_id, token, platform, device_id);
        self.repo.store(&push_token).await?;
        Ok(push_token)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<PushToken>> {
        self.repo.find_by_user(user_id).await
    }

    pub async fn unregister(&self, token: &str) -> Result<()> {
        self.repo.delete(token).await
    }

    pub async fn unregister_all(&self, user_id: Uuid) -> Result<()> {
        self.repo.delete_by_user(user_id).await
    }

    /// 停用令牌（例如服务商报告令牌失效后由运维或上层调用）
    pub async fn deactivate(&self, token: &str) -> Result<()> {
        self.repo.deactivate(token).await
    }
}
