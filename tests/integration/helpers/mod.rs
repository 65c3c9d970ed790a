// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod memory_store;

use axum::Router;
use axum_test::TestServer;
use memory_broker::MemoryBroker;
use memory_store::MemoryTaskStore;
use std::sync::Arc;
use std::time::Duration;
use xmdq::application::use_cases::task_use_case::TaskUseCase;
use xmdq::config::settings::{Settings, TagStoreSettings};
use xmdq::domain::repositories::tag_store::TagStore;
use xmdq::domain::services::status_resolver::StatusResolver;
use xmdq::infrastructure::database::connection;
use xmdq::infrastructure::repositories::sqlite_tag_store::SqliteTagStore;
use xmdq::presentation::routes::{build_app, AppServices};
use xmdq::queue::singleton_guard::SingletonGuard;
use xmdq::queue::submitter::JobSubmitter;
use xmdq::workers::live_status_hub::LiveStatusHub;
use xmdq::workers::live_status_worker::LiveStatusAggregator;

/// 测试应用及其内存依赖
#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub router: Router,
    pub store: Arc<MemoryTaskStore>,
    pub broker: Arc<MemoryBroker>,
    pub resolver: Arc<StatusResolver>,
    pub hub: Arc<LiveStatusHub>,
    pub tag_store: Arc<SqliteTagStore>,
}

pub fn test_settings(autotagger: bool) -> Settings {
    let mut settings = Settings::defaults().expect("default settings");
    settings.tracking.max_tracked_tasks = 5;
    settings.live_status.poll_interval_ms = 50;
    settings.live_status.keep_alive_secs = 1;
    if autotagger {
        settings.autotagger.enabled = true;
        settings.autotagger.url = Some("http://autotagger:8000".to_string());
    }
    settings
}

pub async fn memory_tag_store() -> SqliteTagStore {
    let pool = connection::create_pool(&TagStoreSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("sqlite pool");
    connection::run_migrations(&pool)
        .await
        .expect("tag index migrations");
    SqliteTagStore::new(pool)
}

pub fn resolver_for(
    store: &Arc<MemoryTaskStore>,
    broker: &Arc<MemoryBroker>,
    settings: &Settings,
) -> Arc<StatusResolver> {
    Arc::new(StatusResolver::new(
        store.clone(),
        broker.clone(),
        settings.queue.default_queue.clone(),
        settings.tracking.recent_window,
    ))
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(true).await
}

pub async fn create_test_app_with(autotagger: bool) -> TestApp {
    let settings = Arc::new(test_settings(autotagger));
    let store = Arc::new(MemoryTaskStore::new(settings.tracking.max_tracked_tasks));
    let broker = Arc::new(MemoryBroker::new());

    let resolver = resolver_for(&store, &broker, &settings);
    let submitter = Arc::new(JobSubmitter::new(
        broker.clone(),
        store.clone(),
        &settings.queue,
    ));
    let guard = Arc::new(SingletonGuard::new(resolver.clone(), submitter.clone()));
    let use_case = Arc::new(TaskUseCase::new(
        submitter,
        guard,
        settings.autotagger.is_configured(),
    ));
    let hub = LiveStatusHub::new(
        Arc::new(LiveStatusAggregator::new(resolver.clone())),
        Duration::from_millis(settings.live_status.poll_interval_ms),
        settings.live_status.channel_capacity,
    );
    let tag_store = Arc::new(memory_tag_store().await);

    let app = build_app(AppServices {
        resolver: resolver.clone(),
        use_case,
        hub: hub.clone(),
        tag_store: tag_store.clone() as Arc<dyn TagStore>,
        settings,
    });

    TestApp {
        server: TestServer::new(app.clone()).expect("test server"),
        router: app,
        store,
        broker,
        resolver,
        hub,
        tag_store,
    }
}
