//! 长驻任务句柄（TaskHandle）
//!
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 任务运行句柄：用于优雅关闭与等待任务结束，丢弃时自动取消
pub struct TaskHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TaskHandle {
    pub(crate) fn new(token: CancellationToken, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { token, tasks }
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.is_finished())
    }

    /// 等待全部任务完成（不会主动取消，需先 `shutdown` 或取消上游令牌）
    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            if let Err(e) = t.await {
                tracing::error!(error = %e, "background task terminated abnormally");
            }
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            self.token.cancel();
        }
    }
}
