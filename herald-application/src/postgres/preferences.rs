use crate::error::AppResult as Result;
use crate::notification::{PreferencesRepository, UserPreferences};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgPreferencesRepository {
    pool: PgPool,
}

impl PgPreferencesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferencesRepository for PgPreferencesRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserPreferences>> {
        let row: Option<PreferencesRow> = sqlx::query_as(
            r#"
            SELECT user_id, email_enabled, sms_enabled, push_enabled, in_app_enabled,
                   quiet_start, quiet_end, updated_at
            FROM notification_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn upsert(&self, prefs: &UserPreferences) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_preferences
                (user_id, email_enabled, sms_enabled, push_enabled, in_app_enabled,
                 quiet_start, quiet_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                email_enabled = EXCLUDED.email_enabled,
                sms_enabled = EXCLUDED.sms_enabled,
                push_enabled = EXCLUDED.push_enabled,
                in_app_enabled = EXCLUDED.in_app_enabled,
                quiet_start = EXCLUDED.quiet_start,
                quiet_end = EXCLUDED.quiet_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(prefs.user_id)
        .bind(prefs.email_enabled)
        .bind(prefs.sms_enabled)
        .bind(prefs.push_enabled)
        .bind(prefs.in_app_enabled)
        .bind(prefs.quiet_start)
        .bind(prefs.quiet_end)
        .bind(prefs.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PreferencesRow {
    user_id: Uuid,
    email_enabled: bool,
    sms_enabled: bool,
    push_enabled: bool,
    in_app_enabled: bool,
    quiet_start: Option<NaiveTime>,
    quiet_end: Option<NaiveTime>,
    updated_at: DateTime<Utc>,
}

impl From<PreferencesRow> for UserPreferences {
    fn from(row: PreferencesRow) -> Self {
        Self {
            user_id: row.user_id,
            email_enabled: row.email_enabled,
            sms_enabled: row.sms_enabled,
            push_enabled: row.push_enabled,
            in_app_enabled: row.in_app_enabled,
            quiet_start: row.quiet_start,
            quiet_end: row.quiet_end,
            updated_at: row.updated_at,
        }
    }
}
