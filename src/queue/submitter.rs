// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::QueueSettings;
use crate::domain::models::task::{QueueLane, TaskFamily, TaskRecord, TaskState};
use crate::domain::repositories::task_store::TaskStore;
use crate::queue::broker::{Broker, BrokerError, BrokerMessage, EnqueueOptions};
use crate::utils::url_utils::is_download_url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 提交错误类型
///
/// 只有入队失败会返回错误；入队成功后的跟踪写入失败只记录日志。
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Broker 错误
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// 已入队的下载任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub task_id: String,
    pub url: String,
}

/// 批量下载提交结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadBatch {
    pub queued: Vec<QueuedTask>,
    /// 未通过校验被丢弃的 URL 数
    pub rejected: usize,
    /// 入队失败被跳过的 URL 数
    pub failed: usize,
}

/// 任务提交器
///
/// 生成 task id，入队，并写入初始跟踪状态。是新任务记录的唯一写入方。
pub struct JobSubmitter {
    broker: Arc<dyn Broker>,
    store: Arc<dyn TaskStore>,
    default_queue: String,
    interactive_queue: String,
}

impl JobSubmitter {
    /// 创建新的任务提交器
    ///
    /// # 参数
    ///
    /// * `broker` - 任务 broker
    /// * `store` - 任务存储
    /// * `queues` - 队列配置
    pub fn new(broker: Arc<dyn Broker>, store: Arc<dyn TaskStore>, queues: &QueueSettings) -> Self {
        Self {
            broker,
            store,
            default_queue: queues.default_queue.clone(),
            interactive_queue: queues.interactive_queue.clone(),
        }
    }

    /// 任务族对应的队列名
    pub fn queue_for(&self, family: TaskFamily) -> &str {
        match family.lane() {
            QueueLane::Default => &self.default_queue,
            QueueLane::Interactive => &self.interactive_queue,
        }
    }

    /// 提交单个任务
    ///
    /// # 参数
    ///
    /// * `family` - 任务族
    /// * `payload` - 发送给 worker 的载荷
    /// * `initial` - 初始 PENDING 状态的结果对象
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 新任务 id
    /// * `Err(SubmitError)` - 入队失败，此时不会留下任何跟踪记录
    pub async fn submit(
        &self,
        family: TaskFamily,
        payload: Value,
        initial: Map<String, Value>,
    ) -> Result<String, SubmitError> {
        let task_id = self.enqueue(family, payload).await?;
        self.write_initial_state(&task_id, initial).await;

        if family.is_tracked() {
            if let Err(e) = self.store.track(family, std::slice::from_ref(&task_id)).await {
                warn!(task_id = %task_id, error = %e, "Failed to track task");
            }
        }
        if let Some(group) = family.singleton_group() {
            if let Err(e) = self.store.set_singleton(group, &task_id).await {
                warn!(task_id = %task_id, group = %group, error = %e, "Failed to update singleton pointer");
            }
        }
        Ok(task_id)
    }

    /// 批量提交下载任务
    ///
    /// 每个 URL 独立校验和入队：无效 URL 被丢弃，入队失败的条目被跳过，
    /// 其余条目照常提交。整批结束后一次性写入跟踪列表。
    pub async fn submit_downloads<S: AsRef<str>>(&self, urls: &[S]) -> DownloadBatch {
        let mut batch = DownloadBatch::default();

        for raw in urls {
            let url = raw.as_ref().trim();
            if !is_download_url(url) {
                debug!(url = %url, "Skipping invalid download URL");
                metrics::counter!("xmdq_invalid_urls_total").increment(1);
                batch.rejected += 1;
                continue;
            }

            let payload = json!({ "url": url });
            let task_id = match self.enqueue(TaskFamily::Download, payload).await {
                Ok(task_id) => task_id,
                Err(e) => {
                    error!(url = %url, error = %e, "Failed to enqueue download task");
                    batch.failed += 1;
                    continue;
                }
            };

            self.write_initial_state(&task_id, initial_payload(TaskFamily::Download, None))
                .await;
            if let Err(e) = self.store.record_url(&task_id, url).await {
                warn!(task_id = %task_id, url = %url, error = %e, "Failed to record task URL");
            }
            batch.queued.push(QueuedTask {
                task_id,
                url: url.to_string(),
            });
        }

        let ids: Vec<String> = batch.queued.iter().map(|t| t.task_id.clone()).collect();
        if let Err(e) = self.store.track(TaskFamily::Download, &ids).await {
            warn!(count = ids.len(), error = %e, "Failed to track download tasks");
        }

        info!(
            count = batch.queued.len(),
            rejected = batch.rejected,
            failed = batch.failed,
            "Download tasks queued"
        );
        batch
    }

    async fn enqueue(&self, family: TaskFamily, payload: Value) -> Result<String, SubmitError> {
        let task_id = Uuid::new_v4().to_string();
        let message = BrokerMessage {
            task_id: task_id.clone(),
            task_type: family.task_type().to_string(),
            payload,
        };
        let options = EnqueueOptions {
            queue: self.queue_for(family).to_string(),
            timeout: family.timeout(),
            max_retry: 0,
        };

        match self.broker.enqueue(&message, &options).await {
            Ok(()) => {
                metrics::counter!("xmdq_tasks_enqueued_total", "task_type" => family.task_type())
                    .increment(1);
                debug!(task_id = %task_id, task_type = %family, queue = %options.queue, "Task enqueued");
                Ok(task_id)
            }
            Err(e) => {
                metrics::counter!("xmdq_enqueue_failures_total", "task_type" => family.task_type())
                    .increment(1);
                Err(e.into())
            }
        }
    }

    /// 写入初始 PENDING；worker 已经上报过的任务保持原状，状态不会倒退
    async fn write_initial_state(&self, task_id: &str, initial: Map<String, Value>) {
        let record = TaskRecord::new(TaskState::Pending, initial);
        match self.store.put_state_if_absent(task_id, &record).await {
            Ok(true) => {}
            Ok(false) => debug!(task_id = %task_id, "Worker reported before initial state"),
            Err(e) => warn!(task_id = %task_id, error = %e, "Failed to write initial task state"),
        }
    }
}

/// 各任务族的初始 PENDING 结果对象
///
/// `total` 用于批量任务，记录条目数。
pub fn initial_payload(family: TaskFamily, total: Option<usize>) -> Map<String, Value> {
    let value = match family {
        TaskFamily::Download => json!({ "status": "Queued" }),
        TaskFamily::AutotagAll | TaskFamily::AutotagUntagged | TaskFamily::ReconcileDb => {
            json!({ "status": "Task is pending..." })
        }
        TaskFamily::DeleteUser => json!({ "message": "Delete user task queued" }),
        TaskFamily::DeleteImage => json!({ "message": "Delete image task queued" }),
        TaskFamily::BulkDelete => {
            let total = total.unwrap_or(0);
            json!({
                "message": format!("Bulk delete task queued ({} images)", total),
                "total": total,
            })
        }
        TaskFamily::RetagImage => json!({ "message": "Retag task queued" }),
        TaskFamily::Retag => json!({
            "message": "Bulk retag task queued",
            "total": total.unwrap_or(0),
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
