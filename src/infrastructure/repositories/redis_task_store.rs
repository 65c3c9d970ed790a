// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::TrackingSettings;
use crate::domain::models::task::{SingletonGroup, TaskFamily, TaskRecord, TaskState};
use crate::domain::repositories::task_store::{StoreError, TaskStore};
use crate::infrastructure::cache::redis_client::RedisClient;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Redis 任务存储实现
pub struct RedisTaskStore {
    redis: RedisClient,
    prefix: String,
    max_tracked: usize,
    state_ttl_secs: u64,
    singleton_ttl_secs: u64,
}

impl RedisTaskStore {
    /// 创建新的 Redis 任务存储实例
    ///
    /// # 参数
    ///
    /// * `redis` - Redis 客户端
    /// * `settings` - 跟踪配置（键前缀、列表上限和 TTL）
    pub fn new(redis: RedisClient, settings: &TrackingSettings) -> Self {
        Self {
            redis,
            prefix: settings.key_prefix.clone(),
            max_tracked: settings.max_tracked_tasks,
            state_ttl_secs: settings.state_ttl_secs,
            singleton_ttl_secs: settings.singleton_ttl_secs,
        }
    }

    fn state_key(&self, task_id: &str) -> String {
        format!("{}:task-meta-{}", self.prefix, task_id)
    }

    fn list_key(&self, family: TaskFamily) -> String {
        match family {
            TaskFamily::Download => format!("{}:download_task_ids", self.prefix),
            other => format!("{}:{}_task_ids", self.prefix, other.task_type().replace(':', "_")),
        }
    }

    fn url_key(&self) -> String {
        format!("{}:download_task_urls", self.prefix)
    }

    fn singleton_key(&self, group: SingletonGroup) -> String {
        format!("{}:{}:last_task_id", self.prefix, group)
    }

    fn download_autotag_key(&self) -> String {
        format!("{}:autotag:download:status", self.prefix)
    }

    async fn read_record(&self, key: &str) -> Result<Option<TaskRecord>, StoreError> {
        let Some(raw) = self.redis.get(key).await? else {
            return Ok(None);
        };
        let record = TaskRecord::decode(&raw);
        if record.is_none() {
            warn!(key = %key, "Discarding undecodable task record");
        }
        Ok(record)
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn put_state(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError> {
        let encoded = record.encode()?;
        self.redis
            .set(&self.state_key(task_id), &encoded, self.state_ttl_secs)
            .await?;

        let message = record.message();
        match record.state {
            TaskState::Failure => error!(task_id = %task_id, state = %record.state, message = %message, "Task state updated"),
            TaskState::Progress => debug!(task_id = %task_id, state = %record.state, message = %message, "Task state updated"),
            _ => info!(task_id = %task_id, state = %record.state, message = %message, "Task state updated"),
        }
        Ok(())
    }

    async fn get_state(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        if task_id.trim().is_empty() {
            return Ok(None);
        }
        self.read_record(&self.state_key(task_id)).await
    }

    async fn put_state_if_absent(
        &self,
        task_id: &str,
        record: &TaskRecord,
    ) -> Result<bool, StoreError> {
        let encoded = record.encode()?;
        let written = self
            .redis
            .set_if_absent(&self.state_key(task_id), &encoded, self.state_ttl_secs)
            .await?;
        if written {
            info!(task_id = %task_id, state = %record.state, "Task state initialized");
        } else {
            debug!(task_id = %task_id, "Task already reported, initial state skipped");
        }
        Ok(written)
    }

    async fn track(&self, family: TaskFamily, task_ids: &[String]) -> Result<(), StoreError> {
        // URL 映射与下载列表同生命周期
        let url_key = self.url_key();
        let index = (family == TaskFamily::Download).then_some(url_key.as_str());
        let evicted = self
            .redis
            .push_bounded(&self.list_key(family), task_ids, self.max_tracked, index)
            .await?;
        if evicted > 0 {
            debug!(family = %family, evicted, "Trimmed tracked task list");
        }
        Ok(())
    }

    async fn recent(&self, family: TaskFamily, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ids = self
            .redis
            .lrange(&self.list_key(family), -(limit as isize), -1)
            .await?;
        Ok(ids)
    }

    async fn record_url(&self, task_id: &str, url: &str) -> Result<(), StoreError> {
        self.redis.hset(&self.url_key(), task_id, url).await?;
        Ok(())
    }

    async fn get_url(&self, task_id: &str) -> Result<Option<String>, StoreError> {
        let url = self.redis.hget(&self.url_key(), task_id).await?;
        Ok(url.filter(|u| !u.is_empty()))
    }

    async fn set_singleton(
        &self,
        group: SingletonGroup,
        task_id: &str,
    ) -> Result<(), StoreError> {
        self.redis
            .set(&self.singleton_key(group), task_id, self.singleton_ttl_secs)
            .await?;
        Ok(())
    }

    async fn get_singleton(&self, group: SingletonGroup) -> Result<Option<String>, StoreError> {
        let id = self.redis.get(&self.singleton_key(group)).await?;
        Ok(id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()))
    }

    async fn get_download_autotag_state(&self) -> Result<Option<TaskRecord>, StoreError> {
        self.read_record(&self.download_autotag_key()).await
    }
}
