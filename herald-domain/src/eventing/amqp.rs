//! RabbitMQ 适配器（基于 lapin）
//!
//! - `AmqpPublisher`：声明持久化 topic 交换机并开启发布确认；消息以事件类型为路由键，
//!   持久化投递，`message_id` 为事件 ID，`type` 为事件类型；broker nack 视为发布失败。
//! - `AmqpSubscriber`：额外声明持久化队列，并为每个主题 `t` 绑定 `t.#`；
//!   `subscribe` 只负责开始消费，投递需显式确认。
//!
//! 交换机/队列的声明与绑定在构造时完成，失败立即返回错误。
//! 绑定先于任何发布存在，消费者尚未启动时到达的事件留在队列中。
//!
use crate::best_effort::best_effort;
use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::{Acknowledge, BusEvent, Delivery, EventPublisher, EventSubscriber};
use crate::outbox::OutboxEvent;
use async_trait::async_trait;
use chrono::Utc;
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, future};
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use uuid::Uuid;

const CONTENT_TYPE: &str = "application/json";
const PERSISTENT: u8 = 2;
const REPLY_SUCCESS: u16 = 200;

async fn open_channel(url: &str, exchange: &str) -> Result<(Connection, Channel)> {
    let conn = Connection::connect(url, ConnectionProperties::default())
        .await
        .map_err(|e| DomainError::event_bus(format!("connect: {e}")))?;

    let channel = match conn.create_channel().await {
        Ok(ch) => ch,
        Err(e) => {
            best_effort("close amqp connection", conn.close(REPLY_SUCCESS, "channel failed")).await;
            return Err(DomainError::event_bus(format!("open channel: {e}")));
        }
    };

    let declared = channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await;
    if let Err(e) = declared {
        close_quietly(&channel, &conn).await;
        return Err(DomainError::event_bus(format!(
            "declare exchange {exchange}: {e}"
        )));
    }

    Ok((conn, channel))
}

async fn close_quietly(channel: &Channel, conn: &Connection) {
    best_effort("close amqp channel", channel.close(REPLY_SUCCESS, "closing")).await;
    best_effort("close amqp connection", conn.close(REPLY_SUCCESS, "closing")).await;
}

async fn close_both(channel: &Channel, conn: &Connection) -> Result<()> {
    channel
        .close(REPLY_SUCCESS, "closing")
        .await
        .map_err(|e| DomainError::event_bus(format!("close channel: {e}")))?;
    conn.close(REPLY_SUCCESS, "closing")
        .await
        .map_err(|e| DomainError::event_bus(format!("close connection: {e}")))?;
    Ok(())
}

/// 发布消息的 AMQP 属性：JSON 内容、持久化投递、消息 ID 与类型取自事件
fn publish_properties(event: &OutboxEvent) -> BasicProperties {
    BasicProperties::default()
        .with_content_type(CONTENT_TYPE.into())
        .with_delivery_mode(PERSISTENT)
        .with_message_id(event.id().to_string().into())
        .with_kind(event.event_type().into())
        .with_timestamp(Utc::now().timestamp().max(0) as u64)
}

/// 路由键即事件类型
fn routing_key(event: &OutboxEvent) -> &str {
    event.event_type()
}

fn binding_key(topic: &str) -> String {
    format!("{topic}.#")
}

/// RabbitMQ 发布端；同一实例按顺序使用，需要更高吞吐时创建多个实例
pub struct AmqpPublisher {
    conn: Connection,
    channel: Channel,
    exchange: String,
}

impl AmqpPublisher {
    pub async fn connect(url: &str, exchange: impl Into<String>) -> Result<Self> {
        let exchange = exchange.into();
        let (conn, channel) = open_channel(url, &exchange).await?;

        if let Err(e) = channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
        {
            close_quietly(&channel, &conn).await;
            return Err(DomainError::event_bus(format!("enable confirms: {e}")));
        }

        tracing::info!(exchange = %exchange, "amqp publisher connected");
        Ok(Self {
            conn,
            channel,
            exchange,
        })
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, event: &OutboxEvent) -> Result<()> {
        let confirmation = self
            .channel
            .basic_publish(
                &self.exchange,
                routing_key(event),
                BasicPublishOptions::default(),
                event.payload(),
                publish_properties(event),
            )
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(DomainError::event_bus(format!(
                "broker rejected event {}",
                event.id()
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        close_both(&self.channel, &self.conn).await
    }
}

/// RabbitMQ 订阅端
pub struct AmqpSubscriber {
    conn: Connection,
    channel: Channel,
    exchange: String,
    queue: String,
    topics: Vec<String>,
}

impl AmqpSubscriber {
    /// 连接并声明交换机与队列，同时把 `topics` 全部绑定到队列
    pub async fn connect(
        url: &str,
        exchange: impl Into<String>,
        queue: impl Into<String>,
        topics: &[String],
    ) -> Result<Self> {
        let exchange = exchange.into();
        let queue = queue.into();
        let (conn, channel) = open_channel(url, &exchange).await?;

        let declared = channel
            .queue_declare(
                &queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;
        if let Err(e) = declared {
            close_quietly(&channel, &conn).await;
            return Err(DomainError::event_bus(format!("declare queue {queue}: {e}")));
        }

        for topic in topics {
            if let Err(e) = bind_topic(&channel, &queue, &exchange, topic).await {
                close_quietly(&channel, &conn).await;
                return Err(e);
            }
        }

        tracing::info!(
            exchange = %exchange,
            queue = %queue,
            topics = ?topics,
            "amqp subscriber connected"
        );
        Ok(Self {
            conn,
            channel,
            exchange,
            queue,
            topics: topics.to_vec(),
        })
    }

    /// 构造时已绑定的主题
    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

async fn bind_topic(channel: &Channel, queue: &str, exchange: &str, topic: &str) -> Result<()> {
    let key = binding_key(topic);
    channel
        .queue_bind(
            queue,
            exchange,
            &key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| DomainError::event_bus(format!("bind {key}: {e}")))
}

#[async_trait]
impl EventSubscriber for AmqpSubscriber {
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, Delivery>> {
        if !self.topics.iter().any(|t| t == topic) {
            tracing::warn!(
                topic,
                queue = %self.queue,
                "topic was not bound at connect, binding now"
            );
            bind_topic(&self.channel, &self.queue, &self.exchange, topic).await?;
        }

        let consumer_tag = format!("{}-{}", self.queue, Uuid::now_v7());
        let consumer = self
            .channel
            .basic_consume(
                &self.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| DomainError::event_bus(format!("consume {}: {e}", self.queue)))?;

        tracing::info!(queue = %self.queue, topic, "amqp subscription started");

        let stream = consumer.filter_map(|received| {
            let delivery = match received {
                Ok(message) => {
                    let event = BusEvent {
                        id: message
                            .properties
                            .message_id()
                            .as_ref()
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_default(),
                        event_type: message
                            .properties
                            .kind()
                            .as_ref()
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_else(|| message.routing_key.as_str().to_string()),
                        payload: message.data,
                    };
                    Some(Delivery::with_acker(
                        event,
                        Box::new(AmqpAck {
                            acker: message.acker,
                        }),
                    ))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "amqp consumer error");
                    None
                }
            };
            future::ready(delivery)
        });

        Ok(Box::pin(stream))
    }

    async fn close(&self) -> Result<()> {
        close_both(&self.channel, &self.conn).await
    }
}

struct AmqpAck {
    acker: Acker,
}

#[async_trait]
impl Acknowledge for AmqpAck {
    async fn ack(&self) -> Result<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| DomainError::event_bus(format!("ack: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> OutboxEvent {
        OutboxEvent::builder()
            .aggregate_type("user")
            .aggregate_id("42")
            .event_type("user.created")
            .payload(b"{\"user_id\":\"42\"}".to_vec())
            .build()
    }

    #[test]
    fn published_messages_are_persistent_json_tagged_with_event_identity() {
        let ev = event();
        let props = publish_properties(&ev);

        assert_eq!(props.content_type().as_ref().map(|s| s.as_str()), Some("application/json"));
        assert_eq!(*props.delivery_mode(), Some(2));
        let id = ev.id().to_string();
        assert_eq!(props.message_id().as_ref().map(|s| s.as_str()), Some(id.as_str()));
        assert_eq!(props.kind().as_ref().map(|s| s.as_str()), Some("user.created"));
        assert!(props.timestamp().is_some_and(|ts| ts > 0));
        assert_eq!(routing_key(&ev), "user.created");
    }

    #[test]
    fn topic_binds_every_event_below_it() {
        assert_eq!(binding_key("user"), "user.#");
        assert!(crate::eventing::topic_matches(&binding_key("user"), "user.created"));
        assert!(!crate::eventing::topic_matches(&binding_key("user"), "translation.created"));
    }
}
