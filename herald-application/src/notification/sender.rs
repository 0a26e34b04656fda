//! 外部渠道发送协议
//!
//! 具体服务商（SMTP、推送网关、短信网关）在进程边界实现这些接口。
//!
use crate::error::AppResult;
use crate::notification::{EmailMessage, PushMessage, SmsMessage};
use async_trait::async_trait;

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// 服务商名称（写入投递日志）
    fn provider(&self) -> &str;
    /// 发送邮件，返回服务商消息 ID（如有）
    async fn send(&self, msg: &EmailMessage) -> AppResult<Option<String>>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    fn provider(&self) -> &str;
    async fn send(&self, msg: &SmsMessage) -> AppResult<Option<String>>;
}

#[async_trait]
pub trait PushSender: Send + Sync {
    fn provider(&self) -> &str;
    /// 对全部令牌做一次批量发送；部分令牌失败是正常结果，体现在报告中
    async fn send(&self, msg: &PushMessage, tokens: &[String]) -> AppResult<PushReport>;
}

/// 单个令牌的发送失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    pub token: String,
    pub error: String,
}

/// 批量推送结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<PushFailure>,
    pub provider_message_id: Option<String>,
}

impl PushReport {
    /// 未发生发送时的空报告
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.success_count == 0 && self.failure_count == 0
    }

    /// 至少一个令牌成功即视为整体成功
    pub fn any_succeeded(&self) -> bool {
        self.success_count > 0
    }

    /// 汇总失败信息，用于投递日志
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|f| format!("{}: {}", f.token, f.error))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_summary_lists_each_token() {
        let report = PushReport {
            success_count: 1,
            failure_count: 2,
            failures: vec![
                PushFailure {
                    token: "t2".into(),
                    error: "invalid registration".into(),
                },
                PushFailure {
                    token: "t3".into(),
                    error: "unavailable".into(),
                },
            ],
            provider_message_id: None,
        };

        assert!(report.any_succeeded());
        assert_eq!(
            report.failure_summary().as_deref(),
            Some("t2: invalid registration; t3: unavailable")
        );
        assert!(PushReport::empty().is_empty());
        assert_eq!(PushReport::empty().failure_summary(), None);
    }
}
