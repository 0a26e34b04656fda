use crate::error::{AppError, AppResult as Result};
use crate::notification::{PushToken, PushTokenRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

/// 以令牌字符串为键，保证令牌全局唯一
#[derive(Default)]
pub struct InMemoryPushTokenRepository {
    by_token: DashMap<String, PushToken>,
}

impl InMemoryPushTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PushTokenRepository for InMemoryPushTokenRepository {
    async fn store(&self, token: &PushToken) -> Result<()> {
        self.by_token
            .entry(token.token.clone())
            .and_modify(|existing| {
                existing.user_id = token.user_id;
                existing.platform = token.platform;
                existing.device_id = token.device_id.clone();
                existing.active = token.active;
                existing.updated_at = Utc::now();
            })
            .or_insert_with(|| token.clone());
        Ok(())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<PushToken>> {
        let mut tokens: Vec<PushToken> = self
            .by_token
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.value().clone())
            .collect();
        tokens.sort_by_key(|t| (t.created_at, t.id));
        Ok(tokens)
    }

    async fn deactivate(&self, token: &str) -> Result<()> {
        let mut entry = self
            .by_token
            .get_mut(token)
            .ok_or_else(|| AppError::NotFound(format!("push token {token}")))?;
        entry.active = false;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.by_token.remove(token);
        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<()> {
        self.by_token.retain(|_, t| t.user_id != user_id);
        Ok(())
    }
}
