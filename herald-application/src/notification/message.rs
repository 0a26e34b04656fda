//! 渠道消息：描述一次通知的临时命令对象，不持久化、不携带投递状态
//!
use bon::Builder;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct EmailMessage {
    pub user_id: Uuid,
    pub to: Vec<String>,
    #[builder(default)]
    pub cc: Vec<String>,
    #[builder(default)]
    pub bcc: Vec<String>,
    #[builder(into)]
    pub subject: String,
    #[builder(into)]
    pub body: String,
    #[builder(into)]
    pub html_body: Option<String>,
    #[builder(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct SmsMessage {
    pub user_id: Uuid,
    #[builder(into)]
    pub to: String,
    #[builder(into)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct PushMessage {
    pub user_id: Uuid,
    #[builder(into)]
    pub title: String,
    #[builder(into)]
    pub body: String,
    #[builder(default)]
    pub data: BTreeMap<String, String>,
    #[builder(into)]
    pub image_url: Option<String>,
    pub badge: Option<u32>,
    #[builder(into)]
    pub sound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct InAppMessage {
    pub user_id: Uuid,
    /// 通知类别，如 `translation_completed`
    #[builder(into)]
    pub kind: String,
    #[builder(into)]
    pub title: String,
    #[builder(into)]
    pub body: String,
    #[builder(default)]
    pub data: BTreeMap<String, String>,
    #[builder(into)]
    pub action_url: Option<String>,
    #[builder(into)]
    pub image_url: Option<String>,
}
