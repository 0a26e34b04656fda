//! Outbox 投递任务（OutboxWorker）
//!
//! 周期性从 `OutboxStore` 拉取待发布事件，按拉取顺序逐条发布到总线：
//! - 单条失败只记录失败次数，不影响同批其他事件；
//! - 失败次数达到上限的事件原地标记为放弃（死信），不再调用总线；
//! - 标记写入失败只记录日志，事件在下一轮重新考虑（至少一次）；
//! - 取消只在两轮之间生效，进行中的一轮总会完整结束。
//!
use crate::best_effort::best_effort;
use crate::eventing::{EventPublisher, TaskHandle};
use crate::outbox::{OutboxEvent, OutboxStore};
use bon::Builder;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Worker 配置
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutboxWorkerConfig {
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 每轮最多拉取的事件数
    pub batch_size: usize,
    /// 失败次数上限，达到后事件被放弃
    pub max_retries: u32,
}

impl Default for OutboxWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
            max_retries: 5,
        }
    }
}

/// 单条事件的处理结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Published,
    /// 发布失败，仍可重试
    FailedRetryable,
    /// 发布失败且达到上限，已标记放弃
    FailedExhausted,
    /// 拉取时已达上限，未调用总线，已标记放弃
    Skipped,
}

/// 一轮处理的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub published: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub skipped: usize,
}

impl TickReport {
    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Published => self.published += 1,
            DispatchOutcome::FailedRetryable => self.failed += 1,
            DispatchOutcome::FailedExhausted => {
                self.failed += 1;
                self.abandoned += 1;
            }
            DispatchOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Builder)]
pub struct OutboxWorker {
    store: Arc<dyn OutboxStore>,
    publisher: Arc<dyn EventPublisher>,
    #[builder(default)]
    config: OutboxWorkerConfig,
}

impl OutboxWorker {
    pub fn config(&self) -> &OutboxWorkerConfig {
        &self.config
    }

    /// 执行一轮：拉取、逐条发布、标记；从不因单条失败而中断
    pub async fn run_once(&self) -> TickReport {
        let mut report = TickReport::default();

        let limit = i64::try_from(self.config.batch_size).unwrap_or(i64::MAX);
        let events = match self.store.fetch_unpublished(limit).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "outbox worker failed to fetch unpublished events");
                return report;
            }
        };
        report.fetched = events.len();

        for event in &events {
            let outcome = self.dispatch(event).await;
            report.record(outcome);
        }

        if report.fetched > 0 {
            tracing::debug!(
                fetched = report.fetched,
                published = report.published,
                failed = report.failed,
                abandoned = report.abandoned,
                skipped = report.skipped,
                "outbox tick finished"
            );
        }
        report
    }

    /// 处理单条事件
    pub async fn dispatch(&self, event: &OutboxEvent) -> DispatchOutcome {
        let max_retries = self.config.max_retries;

        if event.is_exhausted(max_retries) {
            tracing::warn!(
                event_id = %event.id(),
                event_type = event.event_type(),
                retry_count = event.retry_count(),
                max_retries,
                last_error = event.last_error().unwrap_or_default(),
                "outbox event exceeded max retries, abandoning"
            );
            best_effort(
                "mark outbox event abandoned",
                self.store.mark_abandoned(event.id()),
            )
            .await;
            return DispatchOutcome::Skipped;
        }

        if let Err(e) = self.publisher.publish(event).await {
            let reason = e.message();
            tracing::warn!(
                event_id = %event.id(),
                event_type = event.event_type(),
                error = %e,
                "failed to publish outbox event"
            );

            return match self.store.mark_failed(event.id(), &reason).await {
                Ok(retry_count) if retry_count >= max_retries => {
                    tracing::warn!(
                        event_id = %event.id(),
                        event_type = event.event_type(),
                        retry_count,
                        "outbox event reached max retries, abandoning"
                    );
                    best_effort(
                        "mark outbox event abandoned",
                        self.store.mark_abandoned(event.id()),
                    )
                    .await;
                    DispatchOutcome::FailedExhausted
                }
                Ok(_) => DispatchOutcome::FailedRetryable,
                Err(store_err) => {
                    tracing::error!(
                        event_id = %event.id(),
                        error = %store_err,
                        "failed to record outbox publish failure"
                    );
                    DispatchOutcome::FailedRetryable
                }
            };
        }

        // 发布成功但标记失败时，下一轮会重复发布（至少一次的代价）
        if let Err(e) = self.store.mark_published(event.id()).await {
            tracing::error!(
                event_id = %event.id(),
                error = %e,
                "failed to mark outbox event as published"
            );
        }
        DispatchOutcome::Published
    }

    /// 启动周期任务；`token` 取消后在当前一轮结束时退出
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> TaskHandle {
        let token = token.child_token();
        let loop_token = token.clone();
        let interval = self.config.poll_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                poll_interval_ms = interval.as_millis() as u64,
                batch_size = self.config.batch_size,
                max_retries = self.config.max_retries,
                "outbox worker started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }

            tracing::info!("outbox worker stopped");
        });

        TaskHandle::new(token, vec![task])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainError, DomainResult};
    use crate::outbox::{InMemoryOutboxStore, OutboxStatus};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// 按事件类型决定失败的发布端
    #[derive(Default)]
    struct ScriptedPublisher {
        failing_types: HashSet<String>,
        published: Mutex<Vec<Uuid>>,
        attempts: Mutex<Vec<Uuid>>,
    }

    impl ScriptedPublisher {
        fn failing(types: &[&str]) -> Self {
            Self {
                failing_types: types.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl EventPublisher for ScriptedPublisher {
        async fn publish(&self, event: &OutboxEvent) -> DomainResult<()> {
            self.attempts.lock().unwrap().push(event.id());
            if self.failing_types.contains(event.event_type()) {
                return Err(DomainError::event_bus("network error"));
            }
            self.published.lock().unwrap().push(event.id());
            Ok(())
        }

        async fn close(&self) -> DomainResult<()> {
            Ok(())
        }
    }

    fn event(event_type: &str, retry_count: u32) -> OutboxEvent {
        OutboxEvent::builder()
            .aggregate_type("user")
            .aggregate_id("1")
            .event_type(event_type)
            .payload(b"{}".to_vec())
            .retry_count(retry_count)
            .build()
    }

    fn worker(
        store: Arc<InMemoryOutboxStore>,
        publisher: Arc<ScriptedPublisher>,
        max_retries: u32,
    ) -> OutboxWorker {
        OutboxWorker::builder()
            .store(store)
            .publisher(publisher)
            .config(OutboxWorkerConfig {
                max_retries,
                ..Default::default()
            })
            .build()
    }

    #[tokio::test]
    async fn failure_of_one_event_does_not_block_the_batch() {
        let store = Arc::new(InMemoryOutboxStore::new());
        let bad = event("user.broken", 0);
        let good = event("user.created", 0);
        store.store(&[bad.clone(), good.clone()]).await.unwrap();

        let publisher = Arc::new(ScriptedPublisher::failing(&["user.broken"]));
        let report = worker(store.clone(), publisher.clone(), 5).run_once().await;

        assert_eq!(
            report,
            TickReport {
                fetched: 2,
                published: 1,
                failed: 1,
                abandoned: 0,
                skipped: 0,
            }
        );
        assert!(store.get(good.id()).await.unwrap().published_at().is_some());
        let bad_row = store.get(bad.id()).await.unwrap();
        assert_eq!(bad_row.retry_count(), 1);
        assert_eq!(bad_row.last_error(), Some("network error"));
    }

    #[tokio::test]
    async fn exhausted_event_is_skipped_without_calling_the_bus() {
        let store = Arc::new(InMemoryOutboxStore::new());
        let dead = event("user.created", 5);
        store.store(&[dead.clone()]).await.unwrap();

        let publisher = Arc::new(ScriptedPublisher::default());
        let outcome = worker(store.clone(), publisher.clone(), 5)
            .dispatch(&dead)
            .await;

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert!(publisher.attempts.lock().unwrap().is_empty());
        assert_eq!(
            store.get(dead.id()).await.unwrap().status(),
            OutboxStatus::Abandoned
        );
    }

    #[tokio::test]
    async fn failure_reaching_the_ceiling_abandons_in_place() {
        let store = Arc::new(InMemoryOutboxStore::new());
        let ev = event("user.broken", 2);
        store.store(&[ev.clone()]).await.unwrap();

        let publisher = Arc::new(ScriptedPublisher::failing(&["user.broken"]));
        let w = worker(store.clone(), publisher.clone(), 3);

        assert_eq!(w.dispatch(&ev).await, DispatchOutcome::FailedExhausted);

        let row = store.get(ev.id()).await.unwrap();
        assert_eq!(row.retry_count(), 3);
        assert_eq!(row.status(), OutboxStatus::Abandoned);
        assert_eq!(row.published_at(), None);
        assert!(store.fetch_unpublished(10).await.unwrap().is_empty());
        assert_eq!(store.fetch_abandoned(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn batch_size_bounds_each_tick() {
        let store = Arc::new(InMemoryOutboxStore::new());
        for _ in 0..5 {
            store.store(&[event("user.created", 0)]).await.unwrap();
        }

        let publisher = Arc::new(ScriptedPublisher::default());
        let w = OutboxWorker::builder()
            .store(store.clone())
            .publisher(publisher.clone())
            .config(OutboxWorkerConfig {
                batch_size: 2,
                ..Default::default()
            })
            .build();

        assert_eq!(w.run_once().await.published, 2);
        assert_eq!(w.run_once().await.published, 2);
        assert_eq!(w.run_once().await.published, 1);
        assert_eq!(w.run_once().await.fetched, 0);
        assert_eq!(publisher.published.lock().unwrap().len(), 5);
    }

    #[test]
    fn default_config_matches_documented_knobs() {
        let cfg = OutboxWorkerConfig::default();
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.max_retries, 5);
    }
}
