use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain_event::DomainEvent;
use crate::error::{DomainError, DomainResult};

/// Outbox 事件的生命周期状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    /// 待发布（Worker 会继续尝试）
    #[default]
    Pending,
    /// 已确认发布（终态）
    Published,
    /// 重试次数耗尽，原地保留等待人工处理（终态）
    Abandoned,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Published => "published",
            OutboxStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OutboxStatus::Pending)
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "published" => Ok(OutboxStatus::Published),
            "abandoned" => Ok(OutboxStatus::Abandoned),
            other => Err(DomainError::Parse {
                reason: format!("unknown outbox status: {other}"),
            }),
        }
    }
}

/// 可靠投递的最小单元
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// 事件唯一标识，同时作为总线消息 ID
    #[builder(default = Uuid::now_v7())]
    id: Uuid,
    /// 来源聚合类型（仅用于审计/路由）
    #[builder(into)]
    aggregate_type: String,
    /// 来源聚合 ID（仅用于审计/路由）
    #[builder(into)]
    aggregate_id: String,
    /// 事件类型，作为总线路由键
    #[builder(into)]
    event_type: String,
    /// 生产方序列化的载荷，对投递子系统不透明
    #[builder(into)]
    payload: Vec<u8>,
    /// 创建时间，决定 FIFO 顺序
    #[builder(default = Utc::now())]
    created_at: DateTime<Utc>,
    /// 确认发布时间，发布前为空
    published_at: Option<DateTime<Utc>>,
    /// 失败次数（单调递增）
    #[builder(default)]
    retry_count: u32,
    /// 最近一次失败原因（仅用于诊断）
    #[builder(into)]
    last_error: Option<String>,
    #[builder(default)]
    status: OutboxStatus,
}

impl OutboxEvent {
    /// 将领域事件转换为 Outbox 行，载荷序列化为 JSON 字节
    pub fn from_domain_event<E>(event: &E) -> DomainResult<Self>
    where
        E: DomainEvent,
    {
        Ok(OutboxEvent {
            id: event.event_id(),
            aggregate_type: event.aggregate_type().to_string(),
            aggregate_id: event.aggregate_id().to_string(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_vec(event.payload())?,
            created_at: event.occurred_at(),
            published_at: None,
            retry_count: 0,
            last_error: None,
            status: OutboxStatus::Pending,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> OutboxStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    /// 是否已达到重试上限
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }

    // --- 状态迁移（仅供存储实现使用） ---

    /// 设置发布时间；重复调用保持首次写入的值
    pub(crate) fn record_published(&mut self, at: DateTime<Utc>) {
        if self.published_at.is_none() {
            self.published_at = Some(at);
        }
        self.status = OutboxStatus::Published;
    }

    /// 累加失败次数并覆盖失败原因，返回新的失败次数
    pub(crate) fn record_failure(&mut self, reason: &str) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(reason.to_string());
        self.retry_count
    }

    pub(crate) fn record_abandoned(&mut self) {
        if self.status == OutboxStatus::Pending {
            self.status = OutboxStatus::Abandoned;
        }
    }
}
