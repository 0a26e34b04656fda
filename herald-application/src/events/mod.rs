//! 通知订阅的领域事件：主题/类型常量与载荷
//!
//! 载荷结构由事件生产方拥有；这里的类型同时用于生产（写入 Outbox）
//! 和消费（从总线反序列化）。
//!
mod translation;
mod user;

pub use translation::{TranslationCreated, TranslationCreatedPayload};
pub use user::{UserCreated, UserCreatedPayload};

pub const TOPIC_TRANSLATION: &str = "translation";
pub const TRANSLATION_CREATED: &str = "translation.created";

pub const TOPIC_USER: &str = "user";
pub const USER_CREATED: &str = "user.created";
