// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{SingletonGroup, TaskFamily, TaskRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 任务存储错误类型
///
/// 只有传输层问题会作为错误返回；记录不存在不是错误。
#[derive(Error, Debug)]
pub enum StoreError {
    /// Redis 错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 存储不可用（测试替身等非 Redis 实现使用）
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// 任务存储特质
///
/// 任务状态记录、有界最近任务列表、task→URL 映射以及单例指针的唯一持有者。
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// 写入（覆盖）任务状态，并刷新 TTL
    async fn put_state(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError>;

    /// 仅在记录不存在时写入初始状态
    ///
    /// worker 可能在入队之后、初始状态写入之前就已上报，此时保留 worker 的记录，
    /// 返回 `false`。
    async fn put_state_if_absent(
        &self,
        task_id: &str,
        record: &TaskRecord,
    ) -> Result<bool, StoreError>;

    /// 读取任务状态；不存在或无法解码时返回 `None`
    async fn get_state(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError>;

    /// 追加到任务族的有界列表，并在同一原子操作中裁剪到上限
    ///
    /// 重复 id 可以接受，读取方负责去重。下载列表淘汰的 id 同时从 URL 映射中删除。
    async fn track(&self, family: TaskFamily, task_ids: &[String]) -> Result<(), StoreError>;

    /// 按插入顺序返回列表中最后 `limit` 个 id
    async fn recent(&self, family: TaskFamily, limit: usize) -> Result<Vec<String>, StoreError>;

    /// 记录下载任务的来源 URL
    async fn record_url(&self, task_id: &str, url: &str) -> Result<(), StoreError>;

    async fn get_url(&self, task_id: &str) -> Result<Option<String>, StoreError>;

    /// 覆盖单例组的"最近一次任务"指针（带 TTL）
    async fn set_singleton(&self, group: SingletonGroup, task_id: &str)
        -> Result<(), StoreError>;

    async fn get_singleton(&self, group: SingletonGroup) -> Result<Option<String>, StoreError>;

    /// 下载完成后隐式触发的 autotag 运行记录（由 worker 写入）
    async fn get_download_autotag_state(&self) -> Result<Option<TaskRecord>, StoreError>;
}

#[async_trait]
impl<T: TaskStore + ?Sized> TaskStore for Arc<T> {
    async fn put_state(&self, task_id: &str, record: &TaskRecord) -> Result<(), StoreError> {
        (**self).put_state(task_id, record).await
    }

    async fn put_state_if_absent(
        &self,
        task_id: &str,
        record: &TaskRecord,
    ) -> Result<bool, StoreError> {
        (**self).put_state_if_absent(task_id, record).await
    }

    async fn get_state(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        (**self).get_state(task_id).await
    }

    async fn track(&self, family: TaskFamily, task_ids: &[String]) -> Result<(), StoreError> {
        (**self).track(family, task_ids).await
    }

    async fn recent(&self, family: TaskFamily, limit: usize) -> Result<Vec<String>, StoreError> {
        (**self).recent(family, limit).await
    }

    async fn record_url(&self, task_id: &str, url: &str) -> Result<(), StoreError> {
        (**self).record_url(task_id, url).await
    }

    async fn get_url(&self, task_id: &str) -> Result<Option<String>, StoreError> {
        (**self).get_url(task_id).await
    }

    async fn set_singleton(
        &self,
        group: SingletonGroup,
        task_id: &str,
    ) -> Result<(), StoreError> {
        (**self).set_singleton(group, task_id).await
    }

    async fn get_singleton(&self, group: SingletonGroup) -> Result<Option<String>, StoreError> {
        (**self).get_singleton(group).await
    }

    async fn get_download_autotag_state(&self) -> Result<Option<TaskRecord>, StoreError> {
        (**self).get_download_autotag_state().await
    }
}
