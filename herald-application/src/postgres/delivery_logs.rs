use crate::error::{AppError, AppResult as Result};
use crate::notification::{DeliveryLog, DeliveryLogRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgDeliveryLogRepository {
    pool: PgPool,
}

impl PgDeliveryLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLogRepository for PgDeliveryLogRepository {
    async fn store(&self, log: &DeliveryLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_delivery_logs
                (id, notification_id, user_id, channel, status, provider,
                 provider_message_id, error_message, attempts, created_at, delivered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(log.id)
        .bind(log.notification_id)
        .bind(log.user_id)
        .bind(log.channel.as_str())
        .bind(log.status.as_str())
        .bind(&log.provider)
        .bind(log.provider_message_id.as_deref())
        .bind(log.error_message.as_deref())
        .bind(i32::try_from(log.attempts).unwrap_or(i32::MAX))
        .bind(log.created_at)
        .bind(log.delivered_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_notification(&self, notification_id: Uuid) -> Result<Vec<DeliveryLog>> {
        let rows: Vec<DeliveryLogRow> = sqlx::query_as(
            r#"
            SELECT id, notification_id, user_id, channel, status, provider,
                   provider_message_id, error_message, attempts, created_at, delivered_at
            FROM notification_delivery_logs
            WHERE notification_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(notification_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DeliveryLog::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryLogRow {
    id: Uuid,
    notification_id: Option<Uuid>,
    user_id: Uuid,
    channel: String,
    status: String,
    provider: String,
    provider_message_id: Option<String>,
    error_message: Option<String>,
    attempts: i32,
    created_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeliveryLogRow> for DeliveryLog {
    type Error = AppError;

    fn try_from(row: DeliveryLogRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            notification_id: row.notification_id,
            user_id: row.user_id,
            channel: row.channel.parse()?,
            status: row.status.parse()?,
            provider: row.provider,
            provider_message_id: row.provider_message_id,
            error_message: row.error_message,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            created_at: row.created_at,
            delivered_at: row.delivered_at,
        })
    }
}
