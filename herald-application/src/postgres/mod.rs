//! Postgres 版仓储（基于 sqlx）
//!
mod delivery_logs;
mod notifications;
mod preferences;
mod push_tokens;

pub use delivery_logs::PgDeliveryLogRepository;
pub use notifications::PgNotificationRepository;
pub use preferences::PgPreferencesRepository;
pub use push_tokens::PgPushTokenRepository;
