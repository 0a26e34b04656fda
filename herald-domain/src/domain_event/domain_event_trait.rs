use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::metadata::EventMetadata;

/// 领域事件需要满足的通用能力边界
///
/// 载荷的结构由事件生产方拥有，投递子系统只把它当作不透明字节。
pub trait DomainEvent: Send + Sync {
    /// 事件载荷（序列化后写入 Outbox）
    type Payload: Serialize;

    fn metadata(&self) -> &EventMetadata;

    fn payload(&self) -> &Self::Payload;

    /// 事件唯一标识（同时作为总线消息 ID）
    fn event_id(&self) -> Uuid {
        self.metadata().event_id()
    }

    /// 事件类型（点分命名，如 `user.created`）
    fn event_type(&self) -> &str {
        self.metadata().event_type()
    }

    fn aggregate_type(&self) -> &str {
        self.metadata().aggregate_type()
    }

    fn aggregate_id(&self) -> &str {
        self.metadata().aggregate_id()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        *self.metadata().occurred_at()
    }
}
