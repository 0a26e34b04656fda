use crate::notification::{DeliveryLog, DeliveryLogRepository};
use herald_domain::best_effort::best_effort;
use std::sync::Arc;

/// 投递日志写入器：写入失败只记录日志，从不影响发送结果
#[derive(Clone)]
pub struct DeliveryLogWriter {
    repo: Arc<dyn DeliveryLogRepository>,
}

impl DeliveryLogWriter {
    pub fn new(repo: Arc<dyn DeliveryLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn write(&self, log: DeliveryLog) {
        best_effort("store delivery log", self.repo.store(&log)).await;
    }
}
