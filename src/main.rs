// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use xmdq::application::use_cases::task_use_case::TaskUseCase;
use xmdq::config::settings::Settings;
use xmdq::domain::repositories::tag_store::TagStore;
use xmdq::domain::repositories::task_store::TaskStore;
use xmdq::domain::services::status_resolver::StatusResolver;
use xmdq::infrastructure::cache::redis_client::RedisClient;
use xmdq::infrastructure::database::connection;
use xmdq::infrastructure::repositories::redis_task_store::RedisTaskStore;
use xmdq::infrastructure::repositories::sqlite_tag_store::SqliteTagStore;
use xmdq::presentation::routes::{build_app, AppServices};
use xmdq::queue::broker::{Broker, RedisBroker};
use xmdq::queue::singleton_guard::SingletonGuard;
use xmdq::queue::submitter::JobSubmitter;
use xmdq::utils::telemetry;
use xmdq::workers::live_status_hub::LiveStatusHub;
use xmdq::workers::live_status_worker::LiveStatusAggregator;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting xmdq...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    xmdq::infrastructure::metrics::init_metrics(&settings.metrics);

    // 3. Connect to Redis (task store and broker share one multiplexed connection)
    let redis_client = RedisClient::new(&settings.redis.url).await?;
    info!("Redis client initialized");

    let store: Arc<dyn TaskStore> =
        Arc::new(RedisTaskStore::new(redis_client.clone(), &settings.tracking));
    let broker: Arc<dyn Broker> = Arc::new(RedisBroker::new(
        redis_client,
        settings.queue.broker_prefix.clone(),
    ));

    // 4. Tag index
    let pool = connection::create_pool(&settings.tag_store).await?;
    connection::run_migrations(&pool).await?;
    let tag_store: Arc<dyn TagStore> = Arc::new(SqliteTagStore::new(pool));
    info!("Tag index ready");

    // 5. Services
    let resolver = Arc::new(StatusResolver::new(
        store.clone(),
        broker.clone(),
        settings.queue.default_queue.clone(),
        settings.tracking.recent_window,
    ));
    let submitter = Arc::new(JobSubmitter::new(broker, store, &settings.queue));
    let guard = Arc::new(SingletonGuard::new(resolver.clone(), submitter.clone()));
    let autotagger_configured = settings.autotagger.is_configured();
    if !autotagger_configured {
        warn!("Autotagger is not configured; reload and untagged triggers are disabled");
    }
    let use_case = Arc::new(TaskUseCase::new(submitter, guard, autotagger_configured));

    // 6. Live status hub (aggregation starts with the first subscriber)
    let aggregator = Arc::new(LiveStatusAggregator::new(resolver.clone()));
    let hub = LiveStatusHub::new(
        aggregator,
        Duration::from_millis(settings.live_status.poll_interval_ms),
        settings.live_status.channel_capacity,
    );

    // 7. Start HTTP server
    let app = build_app(AppServices {
        resolver,
        use_case,
        hub,
        tag_store,
        settings: settings.clone(),
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
