//! 内存版仓储（基于 dashmap），用于测试与本地开发
//!
mod delivery_logs;
mod notifications;
mod preferences;
mod push_tokens;

pub use delivery_logs::InMemoryDeliveryLogRepository;
pub use notifications::InMemoryNotificationRepository;
pub use preferences::InMemoryPreferencesRepository;
pub use push_tokens::InMemoryPushTokenRepository;
