use anyhow::Result as AnyResult;
use herald_application::events::{
    TOPIC_TRANSLATION, TOPIC_USER, TranslationCreated, TranslationCreatedPayload, UserCreated,
    UserCreatedPayload,
};
use herald_application::inmemory::{
    InMemoryDeliveryLogRepository, InMemoryNotificationRepository, InMemoryPreferencesRepository,
    InMemoryPushTokenRepository,
};
use herald_application::notification::{
    NotificationDispatcher, NotificationRepository, NotificationService,
};
use herald_domain::domain_event::RaisedEvents;
use herald_domain::eventing::{InMemoryEventBus, OutboxWorker, OutboxWorkerConfig};
use herald_domain::outbox::{InMemoryOutboxStore, OutboxEvent, OutboxStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Harness {
    outbox: Arc<InMemoryOutboxStore>,
    bus: Arc<InMemoryEventBus>,
    notifications: Arc<InMemoryNotificationRepository>,
    dispatcher: NotificationDispatcher,
}

fn harness() -> Harness {
    let notifications = Arc::new(InMemoryNotificationRepository::new());
    let service = Arc::new(
        NotificationService::builder()
            .notifications(notifications.clone())
            .preferences(Arc::new(InMemoryPreferencesRepository::new()))
            .push_tokens(Arc::new(InMemoryPushTokenRepository::new()))
            .delivery_logs(Arc::new(InMemoryDeliveryLogRepository::new()))
            .build(),
    );

    Harness {
        outbox: Arc::new(InMemoryOutboxStore::new()),
        bus: Arc::new(InMemoryEventBus::new(128)),
        notifications,
        dispatcher: NotificationDispatcher::new(service),
    }
}

async fn wait_until<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let _ = tokio::time::timeout(Duration::from_secs(3), async {
        while !cond().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn outbox_event_ends_up_as_in_app_notification() -> AnyResult<()> {
    let h = harness();
    let token = CancellationToken::new();

    let consumer = h
        .dispatcher
        .spawn(
            h.bus.clone(),
            vec![TOPIC_TRANSLATION.to_string(), TOPIC_USER.to_string()],
            token.clone(),
        )
        .await?;

    let worker = Arc::new(
        OutboxWorker::builder()
            .store(h.outbox.clone())
            .publisher(h.bus.clone())
            .config(OutboxWorkerConfig {
                poll_interval: Duration::from_millis(20),
                ..Default::default()
            })
            .build(),
    );
    let worker_handle = worker.spawn(token.clone());

    // 生产方：在同一业务操作中累积事件，随后写入 Outbox
    let translator = Uuid::now_v7();
    let newcomer = Uuid::now_v7();
    let mut raised = RaisedEvents::new();
    raised.raise(&TranslationCreated::new(TranslationCreatedPayload {
        translation_id: Uuid::now_v7(),
        user_id: translator,
        source: "en".into(),
        destination: "fr".into(),
        original: "good morning".into(),
        translation: "bonjour".into(),
    }))?;
    raised.raise(&UserCreated::new(UserCreatedPayload {
        user_id: newcomer,
        email: "newcomer@example.com".into(),
        name: None,
    }))?;
    h.outbox.store(&raised.take()).await?;

    let notifications = h.notifications.clone();
    wait_until(|| {
        let notifications = notifications.clone();
        async move {
            notifications.unread_count(translator).await.unwrap_or(0) == 1
                && notifications.unread_count(newcomer).await.unwrap_or(0) == 1
        }
    })
    .await;

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), async {
        worker_handle.join().await;
        consumer.join().await;
    })
    .await?;

    let inbox = h.notifications.find_by_user(translator, 10, 0).await?;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "Translation Complete");
    assert_eq!(inbox[0].body, "Your translation from en to fr is ready");

    let welcome = h.notifications.find_by_user(newcomer, 10, 0).await?;
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0].kind, "welcome");

    assert!(h.outbox.fetch_unpublished(10).await?.is_empty());
    assert_eq!(h.bus.acked(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_and_malformed_events_are_acked_and_ignored() -> AnyResult<()> {
    let h = harness();
    let token = CancellationToken::new();

    let consumer = h
        .dispatcher
        .spawn(h.bus.clone(), vec![TOPIC_USER.to_string()], token.clone())
        .await?;

    let worker = OutboxWorker::builder()
        .store(h.outbox.clone())
        .publisher(h.bus.clone())
        .build();

    let unknown = OutboxEvent::builder()
        .aggregate_type("user")
        .aggregate_id("1")
        .event_type("user.deleted")
        .payload(b"{}".to_vec())
        .build();
    let malformed = OutboxEvent::builder()
        .aggregate_type("user")
        .aggregate_id("2")
        .event_type("user.created")
        .payload(b"{\"user_id\": 42}".to_vec())
        .build();
    h.outbox.store(&[unknown, malformed]).await?;

    let report = worker.run_once().await;
    assert_eq!(report.published, 2);

    let bus = h.bus.clone();
    wait_until(|| {
        let bus = bus.clone();
        async move { bus.acked() == 2 }
    })
    .await;

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), consumer.join()).await?;

    assert_eq!(h.bus.acked(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn events_published_before_the_dispatcher_starts_are_delivered() -> AnyResult<()> {
    let h = harness();
    let token = CancellationToken::new();

    // 与进程启动一致：主题先绑定，消费者稍后才接入
    h.bus.bind(TOPIC_USER);

    let newcomer = Uuid::now_v7();
    let mut raised = RaisedEvents::new();
    raised.raise(&UserCreated::new(UserCreatedPayload {
        user_id: newcomer,
        email: "early@example.com".into(),
        name: Some("Early".into()),
    }))?;
    h.outbox.store(&raised.take()).await?;

    let worker = OutboxWorker::builder()
        .store(h.outbox.clone())
        .publisher(h.bus.clone())
        .build();
    let report = worker.run_once().await;
    assert_eq!(report.published, 1);
    assert!(h.outbox.fetch_unpublished(10).await?.is_empty());

    let consumer = h
        .dispatcher
        .spawn(h.bus.clone(), vec![TOPIC_USER.to_string()], token.clone())
        .await?;

    let notifications = h.notifications.clone();
    wait_until(|| {
        let notifications = notifications.clone();
        async move { notifications.unread_count(newcomer).await.unwrap_or(0) == 1 }
    })
    .await;

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), consumer.join()).await?;

    let welcome = h.notifications.find_by_user(newcomer, 10, 0).await?;
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0].kind, "welcome");
    assert_eq!(h.bus.acked(), 1);
    Ok(())
}
