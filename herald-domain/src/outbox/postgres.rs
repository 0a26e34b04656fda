//! Postgres 版 Outbox 存储（PgOutboxStore）
//!
//! 对应表 `outbox_events`，依赖 `(created_at) WHERE status = 'pending'` 的部分索引
//! 保证拉取待发布事件的成本不随表增长而上升。
//!
use crate::error::{DomainError, DomainResult as Result};
use crate::outbox::{OutboxEvent, OutboxStatus, OutboxStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const INSERT_SQL: &str = r#"
    INSERT INTO outbox_events
        (id, aggregate_type, aggregate_id, event_type, payload, created_at,
         published_at, retry_count, last_error, status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

const SELECT_BY_STATUS_SQL: &str = r#"
    SELECT id, aggregate_type, aggregate_id, event_type, payload, created_at,
           published_at, retry_count, last_error, status
    FROM outbox_events
    WHERE status = $1
    ORDER BY created_at ASC
    LIMIT $2
"#;

#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在调用方的事务内写入 Outbox 行，与领域变更一同提交
    pub async fn store_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        events: &[OutboxEvent],
    ) -> Result<()> {
        for ev in events {
            sqlx::query(INSERT_SQL)
                .bind(ev.id())
                .bind(ev.aggregate_type())
                .bind(ev.aggregate_id())
                .bind(ev.event_type())
                .bind(ev.payload())
                .bind(ev.created_at())
                .bind(ev.published_at())
                .bind(i32::try_from(ev.retry_count()).unwrap_or(i32::MAX))
                .bind(ev.last_error())
                .bind(ev.status().as_str())
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn fetch_by_status(&self, status: OutboxStatus, limit: i64) -> Result<Vec<OutboxEvent>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<OutboxRow> = sqlx::query_as(SELECT_BY_STATUS_SQL)
            .bind(status.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(OutboxEvent::try_from).collect()
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn store(&self, events: &[OutboxEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        Self::store_in_tx(&mut tx, events).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        self.fetch_by_status(OutboxStatus::Pending, limit).await
    }

    async fn mark_published(&self, id: Uuid) -> Result<()> {
        let done = sqlx::query(
            r#"
            UPDATE outbox_events
            SET published_at = COALESCE(published_at, NOW()),
                status = 'published'
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("outbox event {id}")));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<u32> {
        let retry_count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE outbox_events
            SET retry_count = retry_count + 1,
                last_error = $2
            WHERE id = $1
            RETURNING retry_count
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        let retry_count =
            retry_count.ok_or_else(|| DomainError::not_found(format!("outbox event {id}")))?;
        Ok(u32::try_from(retry_count).unwrap_or(0))
    }

    async fn mark_abandoned(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'abandoned'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_abandoned(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        self.fetch_by_status(OutboxStatus::Abandoned, limit).await
    }
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    aggregate_type: String,
    aggregate_id: String,
    event_type: String,
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    retry_count: i32,
    last_error: Option<String>,
    status: String,
}

impl TryFrom<OutboxRow> for OutboxEvent {
    type Error = DomainError;

    fn try_from(row: OutboxRow) -> Result<Self> {
        Ok(OutboxEvent::builder()
            .id(row.id)
            .aggregate_type(row.aggregate_type)
            .aggregate_id(row.aggregate_id)
            .event_type(row.event_type)
            .payload(row.payload)
            .created_at(row.created_at)
            .maybe_published_at(row.published_at)
            .retry_count(u32::try_from(row.retry_count).unwrap_or(0))
            .maybe_last_error(row.last_error)
            .status(row.status.parse()?)
            .build())
    }
}
