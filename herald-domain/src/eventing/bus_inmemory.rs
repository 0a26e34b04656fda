//! 内存版事件总线（InMemoryEventBus）
//!
//! 基于 `tokio::sync::broadcast` 实现的轻量总线，同时满足发布与订阅两个端口：
//! - `publish`：以事件类型为路由键广播；
//! - `bind`：预先绑定主题，绑定之后、订阅之前发布的事件会保留给首个订阅者；
//! - `subscribe`：按 AMQP 主题规则过滤（`*` 匹配一个词，`#` 匹配零或多个词）；
//! - `close`：结束所有订阅流，之后的发布/订阅返回错误。
//!
//! 注意：既无绑定也无订阅者时发送的事件会被丢弃（记录日志）；
//! 订阅方落后超过缓冲容量时丢失的事件只记录日志。

use crate::best_effort::best_effort;
use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::{Acknowledge, BusEvent, Delivery, EventPublisher, EventSubscriber};
use crate::outbox::OutboxEvent;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, future};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct InMemoryEventBus {
    tx: broadcast::Sender<BusEvent>,
    closed: CancellationToken,
    acked: Arc<AtomicUsize>,
    bindings: Arc<Mutex<HashMap<String, broadcast::Receiver<BusEvent>>>>,
}

impl InMemoryEventBus {
    /// 创建一个内存总线，`capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            closed: CancellationToken::new(),
            acked: Arc::new(AtomicUsize::new(0)),
            bindings: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 绑定主题：此后发布的匹配事件由首个 `subscribe(topic)` 接收（受缓冲容量限制）
    pub fn bind(&self, topic: &str) {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_insert_with(|| self.tx.subscribe());
    }

    fn take_receiver(&self, topic: &str) -> broadcast::Receiver<BusEvent> {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic)
            .unwrap_or_else(|| self.tx.subscribe())
    }

    /// 已确认的投递数量
    pub fn acked(&self) -> usize {
        self.acked.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(DomainError::event_bus("in-memory bus is closed"));
        }
        Ok(())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &OutboxEvent) -> Result<()> {
        self.ensure_open()?;
        best_effort(
            "broadcast in-memory event",
            future::ready(self.tx.send(BusEvent::from(event))),
        )
        .await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventBus {
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, Delivery>> {
        self.ensure_open()?;

        let pattern = format!("{topic}.#");
        let acked = self.acked.clone();
        let stream = BroadcastStream::new(self.take_receiver(topic))
            .filter_map(move |received| {
                let delivery = match received {
                    Ok(event) if topic_matches(&pattern, &event.event_type) => {
                        Some(Delivery::with_acker(
                            event,
                            Box::new(CountingAck {
                                acked: acked.clone(),
                            }),
                        ))
                    }
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "in-memory subscriber lagged behind");
                        None
                    }
                };
                future::ready(delivery)
            })
            .take_until(self.closed.clone().cancelled_owned());

        Ok(Box::pin(stream))
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }
}

struct CountingAck {
    acked: Arc<AtomicUsize>,
}

#[async_trait]
impl Acknowledge for CountingAck {
    async fn ack(&self) -> Result<()> {
        self.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// AMQP 主题匹配：`pattern` 与 `routing_key` 均以 `.` 分词
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && match_words(rest, &key[1..]),
        Some((word, rest)) => key.first() == Some(word) && match_words(rest, &key[1..]),
    }
}
