//! 尽力而为（best-effort）调用
//!
//! 用于投递日志写入、消息确认等旁路副作用：错误只记录日志，从不向上传播，
//! 主流程的结果不受其影响。
//!
use std::fmt::Display;
use std::future::Future;

/// 等待 `fut` 完成；失败时以 warn 级别记录 `what` 与错误信息后吞掉
pub async fn best_effort<T, E, F>(what: &str, fut: F)
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    if let Err(e) = fut.await {
        tracing::warn!(operation = what, error = %e, "best-effort call failed");
    }
}
