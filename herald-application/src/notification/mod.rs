//! 通知（Notification）
//!
//! - 模型与渠道消息；
//! - 外部发送协议与仓储协议；
//! - `NotificationService`：按渠道发送，失败相互隔离；
//! - 事件处理器与分发任务；
//! - 用例：站内信收件箱、偏好、推送令牌。
//!
mod delivery_log;
mod dispatcher;
mod handlers;
mod inbox;
mod message;
mod model;
mod preferences;
mod push_tokens;
mod repository;
mod sender;
mod service;

pub use delivery_log::DeliveryLogWriter;
pub use dispatcher::NotificationDispatcher;
pub use handlers::{TranslationCreatedHandler, UserCreatedHandler};
pub use inbox::{InAppInbox, MAX_PAGE_SIZE};
pub use message::{Attachment, EmailMessage, InAppMessage, PushMessage, SmsMessage};
pub use model::{
    Channel, DeliveryLog, DeliveryStatus, InAppNotification, Platform, PushToken, UserPreferences,
};
pub use preferences::Preferences;
pub use push_tokens::PushTokens;
pub use repository::{
    DeliveryLogRepository, NotificationRepository, PreferencesRepository, PushTokenRepository,
};
pub use sender::{EmailSender, PushFailure, PushReport, PushSender, SmsSender};
pub use service::NotificationService;
