// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::{default_message, TaskRecord, TaskResult, TaskState};

/// 统一状态视图
///
/// Status Resolver 的输出，autotag/retag 查询和实时推送都使用这个形状。
/// `status` 字段是人类可读的描述。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// 统一 autotag 视图中标记状态来源
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<StatusSource>,
}

/// 统一 autotag 状态的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// 用户显式触发的 autotag 任务
    Manual,
    /// 下载完成后隐式触发的 autotag
    Download,
}

impl TaskStatus {
    pub fn not_found(status: impl Into<String>) -> Self {
        Self {
            state: TaskState::NotFound,
            status: status.into(),
            task_id: None,
            current: None,
            total: None,
            source: None,
        }
    }

    /// 上游读取失败时的占位值
    pub fn unavailable() -> Self {
        Self::not_found("Unavailable")
    }

    pub fn pending(task_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            state: TaskState::Pending,
            status: status.into(),
            task_id: Some(task_id.into()),
            current: None,
            total: None,
            source: None,
        }
    }

    pub fn from_record(task_id: Option<String>, record: &TaskRecord) -> Self {
        let (current, total) = match record.state {
            TaskState::Progress | TaskState::Success => record.result.progress(),
            _ => (None, None),
        };
        Self {
            state: record.state,
            status: record.message(),
            task_id,
            current,
            total,
            source: None,
        }
    }

    pub fn with_source(mut self, source: StatusSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// 单个下载任务的状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadTaskStatus {
    pub task_id: String,
    pub url: Option<String>,
    pub state: TaskState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_count: Option<u64>,
}

impl DownloadTaskStatus {
    /// 没有记录：worker 还没上报，视为排队或运行中
    pub fn queued(task_id: String, url: Option<String>) -> Self {
        Self {
            task_id,
            url,
            state: TaskState::Pending,
            message: default_message(TaskState::Pending).to_string(),
            current: None,
            total: None,
            downloaded_count: None,
            skipped_count: None,
        }
    }

    pub fn from_record(task_id: String, url: Option<String>, record: &TaskRecord) -> Self {
        let mut status = Self::queued(task_id, url);
        status.state = record.state;
        match &record.result {
            TaskResult::Progress {
                current, total, ..
            } => {
                status.current = *current;
                status.total = *total;
            }
            TaskResult::Success {
                downloaded_count,
                skipped_count,
                ..
            } => {
                status.downloaded_count = *downloaded_count;
                status.skipped_count = *skipped_count;
            }
            _ => {}
        }
        status.message = record.message();
        status
    }
}

/// 最近下载任务的状态计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    /// PENDING 与 PROGRESS 之和
    pub pending: usize,
    pub success: usize,
    pub failure: usize,
}

impl StatusSummary {
    pub fn tally<'a>(states: impl IntoIterator<Item = &'a TaskState>) -> Self {
        let mut summary = Self::default();
        for state in states {
            summary.total += 1;
            match state {
                TaskState::Pending | TaskState::Progress => summary.pending += 1,
                TaskState::Success => summary.success += 1,
                TaskState::Failure => summary.failure += 1,
                TaskState::NotFound => {}
            }
        }
        summary
    }
}

/// broker 队列计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounters {
    pub pending: u64,
    pub active: u64,
    pub scheduled: u64,
    pub retry: u64,
}

impl QueueCounters {
    pub fn depth(&self) -> u64 {
        self.pending + self.active + self.scheduled + self.retry
    }
}

/// 下载任务概览
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadSummary {
    pub queue_depth: u64,
    #[serde(default)]
    pub queue: QueueCounters,
    pub summary: StatusSummary,
    pub items: Vec<DownloadTaskStatus>,
    /// 读取失败时为 NOT_FOUND，正常概览不输出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    /// 读取失败时的说明，此时其余字段为默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DownloadSummary {
    pub fn unavailable() -> Self {
        Self {
            state: Some(TaskState::NotFound),
            status: Some("Unavailable".to_string()),
            ..Self::default()
        }
    }
}

/// 单例任务组的忙碌标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locks {
    pub autotag_busy: bool,
    pub retag_busy: bool,
}

/// 推送给实时订阅者的完整快照
///
/// 每个 tick 完整重算，订阅者必须整体替换而不是合并。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatusPayload {
    pub autotag: TaskStatus,
    pub retag: TaskStatus,
    pub download: DownloadSummary,
    pub locks: Locks,
    pub timestamp: DateTime<Utc>,
}

/// 按 id 查询单个任务的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLookup {
    pub task_id: String,
    pub state: TaskState,
    pub message: String,
    #[serde(default)]
    pub result: Map<String, Value>,
}
