use crate::error::{AppError, AppResult as Result};
use crate::notification::{PushToken, PushTokenRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgPushTokenRepository {
    pool: PgPool,
}

impl PgPushTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushTokenRepository for PgPushTokenRepository {
    async fn store(&self, token: &PushToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO push_tokens
                (id, user_id, token, platform, device_id, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (token) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                platform = EXCLUDED.platform,
                device_id = EXCLUDED.device_id,
                active = EXCLUDED.active,
                updated_at = NOW()
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.platform.as_str())
        .bind(&token.device_id)
        .bind(token.active)
        .bind(token.created_at)
        .bind(token.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<PushToken>> {
        let rows: Vec<PushTokenRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, token, platform, device_id, active, created_at, updated_at
            FROM push_tokens
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PushToken::try_from).collect()
    }

    async fn deactivate(&self, token: &str) -> Result<()> {
        let done = sqlx::query(
            "UPDATE push_tokens SET active = FALSE, updated_at = NOW() WHERE token = $1",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("push token {token}")));
        }
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM push_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM push_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PushTokenRow {
    id: Uuid,
    user_id: Uuid,
    token: String,
    platform: String,
    device_id: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PushTokenRow> for PushToken {
    type Error = AppError;

    fn try_from(row: PushTokenRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            platform: row.platform.parse()?,
            device_id: row.device_id,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
