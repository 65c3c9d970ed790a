// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::status::{
    DownloadSummary, DownloadTaskStatus, QueueCounters, StatusSource, StatusSummary, TaskLookup,
    TaskStatus,
};
use crate::domain::models::task::{default_message, SingletonGroup, TaskFamily, TaskState};
use crate::domain::repositories::task_store::{StoreError, TaskStore};
use crate::queue::broker::Broker;
use crate::utils::url_utils::unique_reverse;
use futures::future::join_all;
use serde_json::Map;
use std::sync::Arc;
use tracing::warn;

/// 状态解析服务
///
/// 把任务存储中的记录整理为统一的状态值。只读，不会因为数据缺失而报错，
/// 只有存储层的传输错误会向上传播。
pub struct StatusResolver {
    store: Arc<dyn TaskStore>,
    broker: Arc<dyn Broker>,
    download_queue: String,
    recent_window: usize,
}

impl StatusResolver {
    /// 创建新的状态解析服务
    ///
    /// # 参数
    ///
    /// * `store` - 任务存储
    /// * `broker` - 任务 broker，用于读取队列计数
    /// * `download_queue` - 下载任务所在的队列
    /// * `recent_window` - 未指定 id 时查询的最近任务数
    pub fn new(
        store: Arc<dyn TaskStore>,
        broker: Arc<dyn Broker>,
        download_queue: impl Into<String>,
        recent_window: usize,
    ) -> Self {
        Self {
            store,
            broker,
            download_queue: download_queue.into(),
            recent_window,
        }
    }

    /// 解析某个任务族中的一个任务
    ///
    /// 没有已知 id 时返回 NOT_FOUND；下载和单例任务族在记录缺失时返回 PENDING，
    /// 因为这通常意味着 worker 还没有上报。
    pub async fn resolve(
        &self,
        family: TaskFamily,
        task_id: Option<&str>,
    ) -> Result<TaskStatus, StoreError> {
        let Some(task_id) = task_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(TaskStatus::not_found(no_task_message(family)));
        };

        match self.store.get_state(task_id).await? {
            Some(record) => Ok(TaskStatus::from_record(Some(task_id.to_string()), &record)),
            None if family.is_tracked() || family.singleton_group().is_some() => Ok(
                TaskStatus::pending(task_id, default_message(TaskState::Pending)),
            ),
            None => {
                let mut status = TaskStatus::not_found(default_message(TaskState::NotFound));
                status.task_id = Some(task_id.to_string());
                Ok(status)
            }
        }
    }

    /// 解析单例任务组的最近一次任务
    pub async fn resolve_singleton(&self, group: SingletonGroup) -> Result<TaskStatus, StoreError> {
        let pointer = self.store.get_singleton(group).await?;
        self.resolve(representative(group), pointer.as_deref()).await
    }

    /// 单例任务组是否正忙（最近一次任务为 PENDING 或 PROGRESS）
    pub async fn is_busy(&self, group: SingletonGroup) -> Result<bool, StoreError> {
        Ok(self.resolve_singleton(group).await?.state.is_active())
    }

    /// 按 id 查询单个任务，原样返回结果对象
    pub async fn lookup(&self, task_id: &str) -> Result<TaskLookup, StoreError> {
        let task_id = task_id.trim();
        match self.store.get_state(task_id).await? {
            Some(record) => Ok(TaskLookup {
                task_id: task_id.to_string(),
                state: record.state,
                message: record.message(),
                result: record.raw_result,
            }),
            None => Ok(TaskLookup {
                task_id: task_id.to_string(),
                state: TaskState::NotFound,
                message: default_message(TaskState::NotFound).to_string(),
                result: Map::new(),
            }),
        }
    }

    /// 下载完成后隐式触发的 autotag 状态
    pub async fn implicit_autotag(&self) -> Result<Option<TaskStatus>, StoreError> {
        let record = self.store.get_download_autotag_state().await?;
        Ok(record.map(|record| {
            TaskStatus::from_record(record.embedded_task_id(), &record)
                .with_source(StatusSource::Download)
        }))
    }

    /// 统一的 autotag 状态
    ///
    /// 隐式来源读取失败时退化为只看手动来源。
    pub async fn unified_autotag(&self) -> Result<TaskStatus, StoreError> {
        let (manual, implicit) = tokio::join!(
            self.resolve_singleton(SingletonGroup::Autotag),
            self.implicit_autotag()
        );
        let manual = manual?;
        let implicit = implicit.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read download-triggered autotag state");
            None
        });
        Ok(select_unified(manual, implicit))
    }

    /// 单个下载任务的状态
    ///
    /// URL 映射是尽力而为的；状态读取失败时按 PENDING 处理。
    pub async fn resolve_download(&self, task_id: &str) -> DownloadTaskStatus {
        let (url, record) = tokio::join!(self.store.get_url(task_id), self.store.get_state(task_id));
        let url = url.unwrap_or_else(|e| {
            warn!(task_id = %task_id, error = %e, "Failed to read task URL");
            None
        });
        match record {
            Ok(Some(record)) => DownloadTaskStatus::from_record(task_id.to_string(), url, &record),
            Ok(None) => DownloadTaskStatus::queued(task_id.to_string(), url),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to read task state");
                DownloadTaskStatus::queued(task_id.to_string(), url)
            }
        }
    }

    /// 下载任务概览
    ///
    /// # 参数
    ///
    /// * `requested` - 逗号分隔的 id 列表；为空时使用最近跟踪的任务
    pub async fn download_overview(
        &self,
        requested: Option<&str>,
    ) -> Result<DownloadSummary, StoreError> {
        let ids = match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) => unique_reverse(requested.split(',')),
            None => unique_reverse(
                self.store
                    .recent(TaskFamily::Download, self.recent_window)
                    .await?,
            ),
        };

        let (items, counters) = tokio::join!(
            join_all(ids.iter().map(|id| self.resolve_download(id))),
            self.broker.queue_counters(&self.download_queue)
        );
        let queue = counters.unwrap_or_else(|e| {
            warn!(queue = %self.download_queue, error = %e, "Failed to read queue counters");
            QueueCounters::default()
        });

        Ok(DownloadSummary {
            queue_depth: queue.depth(),
            queue,
            summary: StatusSummary::tally(items.iter().map(|item| &item.state)),
            items,
            state: None,
            status: None,
        })
    }
}

/// 在手动和隐式两个 autotag 来源之间选择
///
/// 状态优先级高者胜出，平局时取手动来源。
pub fn select_unified(mut manual: TaskStatus, implicit: Option<TaskStatus>) -> TaskStatus {
    if manual.state != TaskState::NotFound && manual.source.is_none() {
        manual.source = Some(StatusSource::Manual);
    }
    match implicit {
        Some(implicit) if implicit.state.priority() > manual.state.priority() => implicit,
        _ => manual,
    }
}

fn representative(group: SingletonGroup) -> TaskFamily {
    match group {
        SingletonGroup::Autotag => TaskFamily::AutotagAll,
        SingletonGroup::Retag => TaskFamily::Retag,
    }
}

fn no_task_message(family: TaskFamily) -> &'static str {
    match family.singleton_group() {
        Some(SingletonGroup::Autotag) => "No autotagging task has been run yet.",
        Some(SingletonGroup::Retag) => "No bulk retag task has been run yet.",
        None if family.is_tracked() => "No download task has been queued yet.",
        None => "No task id given.",
    }
}
