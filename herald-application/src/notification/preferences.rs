//! 通知偏好用例
//!
use crate::error::{AppError, AppResult as Result};
use crate::notification::{PreferencesRepository, UserPreferences};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct Preferences {
    repo: Arc<dyn PreferencesRepository>,
}

impl Preferences {
    pub fn new(repo: Arc<dyn PreferencesRepository>) -> Self {
        Self { repo }
    }

    /// 读取偏好；尚无记录时返回缺省值（全部开启）
    pub async fn get(&self, user_id: Uuid) -> Result<UserPreferences> {
        Ok(self
            .repo
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserPreferences::defaults_for(user_id)))
    }

    /// 整体覆盖偏好；免打扰的开始与结束必须同时给出
    pub async fn update(&self, prefs: UserPreferences) -> Result<UserPreferences> {
        if prefs.quiet_start.is_some() != prefs.quiet_end.is_some() {
            return Err(AppError::Validation(
                "quiet_start and quiet_end must be set together".into(),
            ));
        }

        let prefs = UserPreferences {
            updated_at: Utc::now(),
            ..prefs
        };
        self.repo.upsert(&prefs).await?;
        Ok(prefs)
    }
}
