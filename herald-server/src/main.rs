mod config;
mod telemetry;

use anyhow::Context;
use config::Settings;
use herald_application::notification::{NotificationDispatcher, NotificationService};
use herald_application::postgres::{
    PgDeliveryLogRepository, PgNotificationRepository, PgPreferencesRepository,
    PgPushTokenRepository,
};
use herald_domain::eventing::{
    AmqpPublisher, AmqpSubscriber, EventPublisher, EventSubscriber, OutboxWorker,
};
use herald_domain::outbox::PgOutboxStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let settings = Settings::from_env().context("failed to load settings")?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.pg_pool_max)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to postgres")?;

    if settings.migration_enabled {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("migrations applied");
    }

    let publisher = Arc::new(
        AmqpPublisher::connect(&settings.rmq_url, settings.rmq_exchange.clone())
            .await
            .context("failed to connect amqp publisher")?,
    );
    // 队列绑定在任何发布之前完成
    let topics = settings.topics();
    let subscriber = Arc::new(
        AmqpSubscriber::connect(
            &settings.rmq_url,
            settings.rmq_exchange.clone(),
            settings.rmq_notification_queue.clone(),
            &topics,
        )
        .await
        .context("failed to connect amqp subscriber")?,
    );

    let service = Arc::new(
        NotificationService::builder()
            .notifications(Arc::new(PgNotificationRepository::new(pool.clone())))
            .preferences(Arc::new(PgPreferencesRepository::new(pool.clone())))
            .push_tokens(Arc::new(PgPushTokenRepository::new(pool.clone())))
            .delivery_logs(Arc::new(PgDeliveryLogRepository::new(pool.clone())))
            .build(),
    );

    let token = CancellationToken::new();

    let dispatcher = NotificationDispatcher::new(service)
        .spawn(subscriber.clone(), topics.clone(), token.clone())
        .await
        .context("failed to start notification dispatcher")?;
    tracing::info!(topics = ?topics, "notification dispatcher started");

    let worker = if settings.outbox_enabled {
        let worker = Arc::new(
            OutboxWorker::builder()
                .store(Arc::new(PgOutboxStore::new(pool.clone())))
                .publisher(publisher.clone())
                .config(settings.worker_config())
                .build(),
        );
        Some(worker.spawn(token.clone()))
    } else {
        tracing::info!("outbox worker disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");

    token.cancel();
    if let Some(worker) = worker {
        worker.join().await;
    }
    dispatcher.join().await;

    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "failed to close amqp publisher");
    }
    if let Err(e) = subscriber.close().await {
        tracing::warn!(error = %e, "failed to close amqp subscriber");
    }
    pool.close().await;

    tracing::info!("herald stopped");
    Ok(())
}
