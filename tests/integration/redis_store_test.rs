// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use redis::AsyncCommands;
use serde_json::{json, Map};
use std::collections::HashMap;
use testcontainers::runners::AsyncRunner;
use xmdq::config::settings::Settings;
use xmdq::domain::models::task::{SingletonGroup, TaskFamily, TaskRecord, TaskState};
use xmdq::domain::repositories::task_store::TaskStore;
use xmdq::infrastructure::cache::redis_client::RedisClient;
use xmdq::infrastructure::repositories::redis_task_store::RedisTaskStore;
use xmdq::queue::broker::{Broker, BrokerMessage, EnqueueOptions, RedisBroker};

/// 真实 Redis 上的存储与 broker 行为
///
/// 需要 Docker，默认忽略
#[tokio::test]
#[ignore]
async fn test_redis_store_and_broker() {
    let redis_node = testcontainers::GenericImage::new("redis", "7-alpine")
        .start()
        .await
        .expect("Failed to start Redis");
    let redis_port = redis_node
        .get_host_port_ipv4(6379)
        .await
        .expect("Failed to get Redis port");
    let redis = RedisClient::new(&format!("redis://127.0.0.1:{}", redis_port))
        .await
        .expect("Failed to connect to Redis");

    let mut settings = Settings::defaults().unwrap();
    settings.tracking.max_tracked_tasks = 3;
    let store = RedisTaskStore::new(redis.clone(), &settings.tracking);

    // 状态读写
    let mut result = Map::new();
    result.insert("status".to_string(), json!("Downloading 1/2"));
    result.insert("current".to_string(), json!(1));
    store
        .put_state("t-1", &TaskRecord::new(TaskState::Progress, result))
        .await
        .unwrap();
    let record = store.get_state("t-1").await.unwrap().unwrap();
    assert_eq!(record.state, TaskState::Progress);
    assert_eq!(record.message(), "Downloading 1/2");
    assert!(store.get_state("t-2").await.unwrap().is_none());

    // 初始状态只在不存在时写入
    let pending = TaskRecord::new(TaskState::Pending, Map::new());
    assert!(!store.put_state_if_absent("t-1", &pending).await.unwrap());
    assert_eq!(
        store.get_state("t-1").await.unwrap().unwrap().state,
        TaskState::Progress
    );
    assert!(store.put_state_if_absent("t-3", &pending).await.unwrap());

    // 有界列表，被淘汰的 id 同时删除 URL
    let ids: Vec<String> = (0..5).map(|i| format!("d-{i}")).collect();
    for id in &ids {
        store
            .record_url(id, &format!("https://x.com/u/status/{id}"))
            .await
            .unwrap();
    }
    store.track(TaskFamily::Download, &ids[..2]).await.unwrap();
    store.track(TaskFamily::Download, &ids[2..]).await.unwrap();
    let recent = store.recent(TaskFamily::Download, 30).await.unwrap();
    assert_eq!(recent, vec!["d-2", "d-3", "d-4"]);
    assert_eq!(
        store.recent(TaskFamily::Download, 2).await.unwrap(),
        vec!["d-3", "d-4"]
    );

    // URL 映射与单例指针
    assert!(store.get_url("d-0").await.unwrap().is_none());
    assert!(store.get_url("d-1").await.unwrap().is_none());
    assert_eq!(
        store.get_url("d-4").await.unwrap().as_deref(),
        Some("https://x.com/u/status/d-4")
    );
    store.set_singleton(SingletonGroup::Retag, "r-1").await.unwrap();
    assert_eq!(
        store.get_singleton(SingletonGroup::Retag).await.unwrap().as_deref(),
        Some("r-1")
    );
    assert!(store.get_download_autotag_state().await.unwrap().is_none());

    // broker 计数
    let mut con = redis.connection();
    let broker = RedisBroker::new(redis, settings.queue.broker_prefix.clone());
    let options = EnqueueOptions {
        queue: "default".to_string(),
        timeout: TaskFamily::Download.timeout(),
        max_retry: 0,
    };
    for id in ["b-1", "b-2"] {
        let message = BrokerMessage {
            task_id: id.to_string(),
            task_type: TaskFamily::Download.task_type().to_string(),
            payload: json!({ "url": "https://x.com/u/status/1" }),
        };
        broker.enqueue(&message, &options).await.unwrap();
    }
    let envelope: HashMap<String, String> = con.hgetall("asynq:{default}:t:b-1").await.unwrap();
    assert_eq!(envelope["id"], "b-1");
    let payload: serde_json::Value = serde_json::from_str(&envelope["payload"]).unwrap();
    assert_eq!(payload["task_id"], json!("b-1"));
    assert_eq!(payload["url"], json!("https://x.com/u/status/1"));

    let counters = broker.queue_counters("default").await.unwrap();
    assert_eq!(counters.pending, 2);
    assert_eq!(counters.depth(), 2);
}
