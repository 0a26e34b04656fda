//! 通知分发服务（NotificationService）
//!
//! 将一条通知按渠道发送，渠道之间互不影响：
//! - 站内信：偏好查询失败或无偏好记录时照常写入（fail-open），不产生投递日志；
//! - 推送：偏好关闭则跳过；加载用户的激活令牌，无令牌即空操作；
//!   一次批量发送，部分失败通过 `PushReport` 返回；
//! - 邮件/短信：未配置发送器即空操作，失败直接返回给调用方。
//!
//! 每次外部发送尝试（推送/邮件/短信）写一条投递日志，日志写入失败不影响结果。
//!
use crate::error::AppResult as Result;
use crate::notification::{
    Channel, DeliveryLog, DeliveryLogRepository, DeliveryLogWriter, DeliveryStatus, EmailMessage,
    EmailSender, InAppMessage, InAppNotification, NotificationRepository, PreferencesRepository,
    PushMessage, PushReport, PushSender, PushTokenRepository, SmsMessage, SmsSender,
    UserPreferences,
};
use bon::Builder;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use self::notification_service_builder::{IsUnset, SetDeliveryLog, State as BuilderState};

#[derive(Builder)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    preferences: Arc<dyn PreferencesRepository>,
    push_tokens: Arc<dyn PushTokenRepository>,
    #[builder(setters(vis = "pub(crate)"))]
    delivery_log: DeliveryLogWriter,
    email_sender: Option<Arc<dyn EmailSender>>,
    sms_sender: Option<Arc<dyn SmsSender>>,
    push_sender: Option<Arc<dyn PushSender>>,
}

impl<S: BuilderState> NotificationServiceBuilder<S> {
    /// 以仓储构造投递日志写入器
    pub fn delivery_logs(
        self,
        repo: Arc<dyn DeliveryLogRepository>,
    ) -> NotificationServiceBuilder<SetDeliveryLog<S>>
    where
        <S as BuilderState>::DeliveryLog: IsUnset,
    {
        self.delivery_log(DeliveryLogWriter::new(repo))
    }
}

impl NotificationService {
    /// 查询偏好；查询失败记录日志并按“无偏好”处理
    async fn preferences_of(&self, user_id: Uuid) -> Option<UserPreferences> {
        match self.preferences.get(user_id).await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "preference lookup failed, falling back to defaults"
                );
                None
            }
        }
    }

    async fn channel_disabled(&self, user_id: Uuid, channel: Channel) -> bool {
        self.preferences_of(user_id)
            .await
            .is_some_and(|p| !p.allows(channel))
    }

    /// 写入站内信；用户关闭站内信时返回 `None`
    pub async fn send_in_app(&self, msg: &InAppMessage) -> Result<Option<InAppNotification>> {
        if self.channel_disabled(msg.user_id, Channel::InApp).await {
            tracing::debug!(user_id = %msg.user_id, "in-app notifications disabled by user");
            return Ok(None);
        }

        let notification = InAppNotification {
            id: Uuid::now_v7(),
            user_id: msg.user_id,
            kind: msg.kind.clone(),
            title: msg.title.clone(),
            body: msg.body.clone(),
            data: msg.data.clone(),
            action_url: msg.action_url.clone().filter(|s| !s.is_empty()),
            image_url: msg.image_url.clone().filter(|s| !s.is_empty()),
            read: false,
            read_at: None,
            created_at: Utc::now(),
        };

        self.notifications.store(&notification).await?;
        Ok(Some(notification))
    }

    /// 推送到用户的全部激活设备；所有空操作路径返回空报告
    pub async fn send_push(&self, msg: &PushMessage) -> Result<PushReport> {
        if self.channel_disabled(msg.user_id, Channel::Push).await {
            tracing::debug!(user_id = %msg.user_id, "push notifications disabled by user");
            return Ok(PushReport::empty());
        }

        let tokens: Vec<String> = self
            .push_tokens
            .find_by_user(msg.user_id)
            .await?
            .into_iter()
            .filter(|t| t.active)
            .map(|t| t.token)
            .collect();

        if tokens.is_empty() {
            return Ok(PushReport::empty());
        }

        let Some(sender) = self.push_sender.as_ref() else {
            return Ok(PushReport::empty());
        };

        match sender.send(msg, &tokens).await {
            Ok(report) => {
                let status = if report.any_succeeded() {
                    DeliveryStatus::Sent
                } else {
                    DeliveryStatus::Failed
                };
                let mut log =
                    DeliveryLog::attempt(msg.user_id, Channel::Push, status, sender.provider())
                        .with_provider_message_id(report.provider_message_id.clone());
                if let Some(summary) = report.failure_summary() {
                    log = log.with_error(summary);
                }
                self.delivery_log.write(log).await;

                if report.failure_count > 0 {
                    tracing::info!(
                        user_id = %msg.user_id,
                        success = report.success_count,
                        failure = report.failure_count,
                        "push partially failed"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                self.delivery_log
                    .write(
                        DeliveryLog::attempt(
                            msg.user_id,
                            Channel::Push,
                            DeliveryStatus::Failed,
                            sender.provider(),
                        )
                        .with_error(e.to_string()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// 发送邮件；未配置发送器时为空操作
    pub async fn send_email(&self, msg: &EmailMessage) -> Result<()> {
        let Some(sender) = self.email_sender.as_ref() else {
            return Ok(());
        };

        let outcome = sender.send(msg).await;
        self.log_attempt(msg.user_id, Channel::Email, sender.provider(), &outcome)
            .await;
        outcome.map(|_| ())
    }

    /// 发送短信；未配置发送器时为空操作
    pub async fn send_sms(&self, msg: &SmsMessage) -> Result<()> {
        let Some(sender) = self.sms_sender.as_ref() else {
            return Ok(());
        };

        let outcome = sender.send(msg).await;
        self.log_attempt(msg.user_id, Channel::Sms, sender.provider(), &outcome)
            .await;
        outcome.map(|_| ())
    }

    async fn log_attempt(
        &self,
        user_id: Uuid,
        channel: Channel,
        provider: &str,
        outcome: &Result<Option<String>>,
    ) {
        let log = match outcome {
            Ok(message_id) => DeliveryLog::attempt(user_id, channel, DeliveryStatus::Sent, provider)
                .with_provider_message_id(message_id.clone()),
            Err(e) => DeliveryLog::attempt(user_id, channel, DeliveryStatus::Failed, provider)
                .with_error(e.to_string()),
        };
        self.delivery_log.write(log).await;
    }
}
