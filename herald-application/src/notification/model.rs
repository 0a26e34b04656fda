//! 通知领域模型
//!
use crate::error::AppError;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 投递渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Push,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::InApp => "in_app",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "push" => Ok(Channel::Push),
            "in_app" => Ok(Channel::InApp),
            other => Err(AppError::Validation(format!("unknown channel: {other}"))),
        }
    }
}

/// 投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
    Read,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "read" => Ok(DeliveryStatus::Read),
            other => Err(AppError::Validation(format!(
                "unknown delivery status: {other}"
            ))),
        }
    }
}

/// 站内信
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    pub action_url: Option<String>,
    pub image_url: Option<String>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InAppNotification {
    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.read {
            self.read = true;
            self.read_at = Some(at);
        }
    }
}

/// 用户通知偏好（每个用户一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub push_enabled: bool,
    pub in_app_enabled: bool,
    /// 免打扰开始时间（仅作提示，不强制执行）
    pub quiet_start: Option<NaiveTime>,
    pub quiet_end: Option<NaiveTime>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// 缺省偏好：全部渠道开启，无免打扰
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            email_enabled: true,
            sms_enabled: true,
            push_enabled: true,
            in_app_enabled: true,
            quiet_start: None,
            quiet_end: None,
            updated_at: Utc::now(),
        }
    }

    pub fn allows(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email_enabled,
            Channel::Sms => self.sms_enabled,
            Channel::Push => self.push_enabled,
            Channel::InApp => self.in_app_enabled,
        }
    }

    /// `at` 是否落在免打扰窗口内；窗口可跨越午夜，结束时间不含
    pub fn in_quiet_hours(&self, at: NaiveTime) -> bool {
        match (self.quiet_start, self.quiet_end) {
            (Some(start), Some(end)) if start <= end => at >= start && at < end,
            (Some(start), Some(end)) => at >= start || at < end,
            _ => false,
        }
    }
}

/// 推送平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            other => Err(AppError::Validation(format!("unknown platform: {other}"))),
        }
    }
}

/// 设备推送令牌（一个用户可有多台设备）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub platform: Platform,
    pub device_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PushToken {
    pub fn new(
        user_id: Uuid,
        token: impl Into<String>,
        platform: Platform,
        device_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            token: token.into(),
            platform,
            device_id: device_id.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 投递尝试记录（只追加）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLog {
    pub id: Uuid,
    /// 站内信之外的投递可能没有关联通知
    pub notification_id: Option<Uuid>,
    pub user_id: Uuid,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub provider: String,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl DeliveryLog {
    /// 一次投递尝试的结果
    pub fn attempt(
        user_id: Uuid,
        channel: Channel,
        status: DeliveryStatus,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            notification_id: None,
            user_id,
            channel,
            status,
            provider: provider.into(),
            provider_message_id: None,
            error_message: None,
            attempts: 1,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }

    pub fn with_provider_message_id(mut self, id: Option<String>) -> Self {
        self.provider_message_id = id;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }
}
