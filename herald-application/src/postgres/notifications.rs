use crate::error::{AppError, AppResult as Result};
use crate::notification::{InAppNotification, NotificationRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::BTreeMap;
use uuid::Uuid;

const COLUMNS: &str =
    "id, user_id, type, title, body, data, action_url, image_url, read, read_at, created_at";

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn store(&self, n: &InAppNotification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO in_app_notifications
                (id, user_id, type, title, body, data, action_url, image_url,
                 read, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(n.id)
        .bind(n.user_id)
        .bind(&n.kind)
        .bind(&n.title)
        .bind(&n.body)
        .bind(Json(&n.data))
        .bind(n.action_url.as_deref())
        .bind(n.image_url.as_deref())
        .bind(n.read)
        .bind(n.read_at)
        .bind(n.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InAppNotification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM in_app_notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<InAppNotification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM in_app_notifications
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_as_read(&self, id: Uuid) -> Result<()> {
        let done = sqlx::query(
            "UPDATE in_app_notifications
             SET read = TRUE, read_at = COALESCE(read_at, NOW())
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    async fn mark_all_as_read(&self, user_id: Uuid) -> Result<u64> {
        let done = sqlx::query(
            "UPDATE in_app_notifications
             SET read = TRUE, read_at = NOW()
             WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected())
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM in_app_notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    body: String,
    data: Option<Json<BTreeMap<String, String>>>,
    action_url: Option<String>,
    image_url: Option<String>,
    read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for InAppNotification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            title: row.title,
            body: row.body,
            data: row.data.map(|Json(d)| d).unwrap_or_default(),
            action_url: row.action_url,
            image_url: row.image_url,
            read: row.read,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}
