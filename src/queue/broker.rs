// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::status::QueueCounters;
use crate::infrastructure::cache::redis_client::RedisClient;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Broker 错误类型
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Redis 错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 拒绝入队
    #[error("Enqueue rejected: {0}")]
    Rejected(String),
}

/// 发送给 worker 的任务消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerMessage {
    pub task_id: String,
    pub task_type: String,
    pub payload: Value,
}

impl BrokerMessage {
    /// worker 实际收到的载荷：对象载荷总是带上 `task_id`，
    /// worker 按这个 id 写回状态记录
    pub fn wire_payload(&self) -> Value {
        match &self.payload {
            Value::Object(map) => {
                let mut map = map.clone();
                map.entry("task_id")
                    .or_insert_with(|| Value::String(self.task_id.clone()));
                Value::Object(map)
            }
            Value::Null => json!({ "task_id": self.task_id }),
            other => other.clone(),
        }
    }
}

/// 入队选项
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueOptions {
    /// 目标队列名
    pub queue: String,
    /// worker 执行超时
    pub timeout: Duration,
    pub max_retry: u32,
}

/// 任务 Broker 特质
///
/// 入队本身可以安全重试：每次调用都会产生一个独立任务，不做去重。
#[async_trait]
pub trait Broker: Send + Sync {
    /// 入队任务
    async fn enqueue(
        &self,
        message: &BrokerMessage,
        options: &EnqueueOptions,
    ) -> Result<(), BrokerError>;

    /// 获取队列计数
    async fn queue_counters(&self, queue: &str) -> Result<QueueCounters, BrokerError>;
}

/// 基于 Redis 列表的 Broker 实现
///
/// 键布局：`{prefix}:{queue}:t:<id>` 哈希保存消息信封，
/// `{prefix}:{queue}:pending` 列表保存待处理 id。
pub struct RedisBroker {
    /// Redis 客户端
    redis: RedisClient,
    /// 键前缀
    prefix: String,
}

impl RedisBroker {
    /// 创建新的 Redis Broker 实例
    ///
    /// # 参数
    ///
    /// * `redis` - Redis 客户端
    /// * `prefix` - 键前缀
    pub fn new(redis: RedisClient, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn queue_key(&self, queue: &str, suffix: &str) -> String {
        format!("{}:{{{}}}:{}", self.prefix, queue, suffix)
    }

    fn task_key(&self, queue: &str, task_id: &str) -> String {
        format!("{}:{{{}}}:t:{}", self.prefix, queue, task_id)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(
        &self,
        message: &BrokerMessage,
        options: &EnqueueOptions,
    ) -> Result<(), BrokerError> {
        if message.task_id.trim().is_empty() {
            return Err(BrokerError::Rejected("task id is empty".to_string()));
        }

        let fields = [
            ("id", message.task_id.clone()),
            ("type", message.task_type.clone()),
            ("payload", serde_json::to_string(&message.wire_payload())?),
            ("queue", options.queue.clone()),
            ("timeout", options.timeout.as_secs().to_string()),
            ("max_retry", options.max_retry.to_string()),
            ("state", "pending".to_string()),
            ("enqueued_at", Utc::now().timestamp().to_string()),
        ];

        let mut con = self.redis.connection();
        redis::pipe()
            .atomic()
            .hset_multiple(self.task_key(&options.queue, &message.task_id), &fields)
            .ignore()
            .rpush(self.queue_key(&options.queue, "pending"), &message.task_id)
            .ignore()
            .sadd(format!("{}:queues", self.prefix), &options.queue)
            .ignore()
            .query_async::<()>(&mut con)
            .await?;

        Ok(())
    }

    async fn queue_counters(&self, queue: &str) -> Result<QueueCounters, BrokerError> {
        let mut con = self.redis.connection();
        let (pending, active, scheduled, retry): (u64, u64, u64, u64) = redis::pipe()
            .llen(self.queue_key(queue, "pending"))
            .llen(self.queue_key(queue, "active"))
            .zcard(self.queue_key(queue, "scheduled"))
            .zcard(self.queue_key(queue, "retry"))
            .query_async(&mut con)
            .await?;

        Ok(QueueCounters {
            pending,
            active,
            scheduled,
            retry,
        })
    }
}

#[async_trait]
impl<T: Broker + ?Sized> Broker for Arc<T> {
    async fn enqueue(
        &self,
        message: &BrokerMessage,
        options: &EnqueueOptions,
    ) -> Result<(), BrokerError> {
        (**self).enqueue(message, options).await
    }

    async fn queue_counters(&self, queue: &str) -> Result<QueueCounters, BrokerError> {
        (**self).queue_counters(queue).await
    }
}
