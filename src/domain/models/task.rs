// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 任务族
///
/// 每个任务族对应 broker 中的一种任务类型，拥有自己的队列、超时、
/// 跟踪列表或单例指针。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFamily {
    /// 下载远程媒体
    Download,
    /// 强制重新标注全部图片
    AutotagAll,
    /// 仅标注未标注的图片
    AutotagUntagged,
    /// 数据库一致性检查与清理
    ReconcileDb,
    /// 删除用户及其全部媒体
    DeleteUser,
    /// 删除单张图片
    DeleteImage,
    /// 批量删除图片
    BulkDelete,
    /// 重新标注单张图片
    RetagImage,
    /// 批量重新标注
    Retag,
}

/// 队列通道
///
/// 长耗时任务走默认队列，用户交互触发的短任务走交互队列。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLane {
    Default,
    Interactive,
}

/// 单例任务组
///
/// 同一组内同一时刻最多只允许一个任务处于运行中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingletonGroup {
    Autotag,
    Retag,
}

impl fmt::Display for SingletonGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SingletonGroup::Autotag => write!(f, "autotag"),
            SingletonGroup::Retag => write!(f, "retag"),
        }
    }
}

impl TaskFamily {
    pub const ALL: [TaskFamily; 9] = [
        TaskFamily::Download,
        TaskFamily::AutotagAll,
        TaskFamily::AutotagUntagged,
        TaskFamily::ReconcileDb,
        TaskFamily::DeleteUser,
        TaskFamily::DeleteImage,
        TaskFamily::BulkDelete,
        TaskFamily::RetagImage,
        TaskFamily::Retag,
    ];

    /// broker 中的任务类型名
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskFamily::Download => "xmd:download_tweet_media",
            TaskFamily::AutotagAll => "xmd:autotag_all",
            TaskFamily::AutotagUntagged => "xmd:autotag_untagged",
            TaskFamily::ReconcileDb => "xmd:reconcile_db",
            TaskFamily::DeleteUser => "xmd:delete_user",
            TaskFamily::DeleteImage => "xmd:delete_image",
            TaskFamily::BulkDelete => "xmd:delete_images",
            TaskFamily::RetagImage => "xmd:retag_image",
            TaskFamily::Retag => "xmd:retag_images",
        }
    }

    pub fn lane(&self) -> QueueLane {
        match self {
            TaskFamily::Download
            | TaskFamily::AutotagAll
            | TaskFamily::AutotagUntagged
            | TaskFamily::ReconcileDb => QueueLane::Default,
            _ => QueueLane::Interactive,
        }
    }

    /// worker 执行该任务的超时上限
    pub fn timeout(&self) -> Duration {
        const MINUTE: u64 = 60;
        match self {
            TaskFamily::Download => Duration::from_secs(30 * MINUTE),
            TaskFamily::AutotagAll | TaskFamily::AutotagUntagged | TaskFamily::ReconcileDb => {
                Duration::from_secs(12 * 60 * MINUTE)
            }
            TaskFamily::DeleteUser => Duration::from_secs(10 * MINUTE),
            TaskFamily::DeleteImage => Duration::from_secs(5 * MINUTE),
            TaskFamily::BulkDelete => Duration::from_secs(30 * MINUTE),
            TaskFamily::RetagImage => Duration::from_secs(10 * MINUTE),
            TaskFamily::Retag => Duration::from_secs(30 * MINUTE),
        }
    }

    pub fn singleton_group(&self) -> Option<SingletonGroup> {
        match self {
            TaskFamily::AutotagAll | TaskFamily::AutotagUntagged | TaskFamily::ReconcileDb => {
                Some(SingletonGroup::Autotag)
            }
            TaskFamily::Retag => Some(SingletonGroup::Retag),
            _ => None,
        }
    }

    /// 是否维护有界的最近任务列表
    pub fn is_tracked(&self) -> bool {
        matches!(self, TaskFamily::Download)
    }
}

impl fmt::Display for TaskFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.task_type())
    }
}

impl FromStr for TaskFamily {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskFamily::ALL
            .iter()
            .copied()
            .find(|family| family.task_type() == s)
            .ok_or(())
    }
}

/// 任务状态
///
/// 存储中只会出现前四种；`NotFound` 只在查询边界合成。
/// 状态转换单调：Pending → Progress* → Success/Failure。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Progress,
    Success,
    Failure,
    NotFound,
}

impl TaskState {
    /// 用于统一 autotag 状态选择的优先级
    pub fn priority(&self) -> u8 {
        match self {
            TaskState::Progress => 4,
            TaskState::Pending => 3,
            TaskState::Success | TaskState::Failure => 2,
            TaskState::NotFound => 1,
        }
    }

    /// 任务仍在排队或执行中
    pub fn is_active(&self) -> bool {
        matches!(self, TaskState::Pending | TaskState::Progress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Progress => "PROGRESS",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskState::Pending),
            "PROGRESS" => Ok(TaskState::Progress),
            "SUCCESS" => Ok(TaskState::Success),
            "FAILURE" => Ok(TaskState::Failure),
            "NOT_FOUND" => Ok(TaskState::NotFound),
            _ => Err(()),
        }
    }
}

/// 按状态区分的结果载荷
///
/// worker 写入的结果是松散的 JSON 对象，这里按状态解码为只包含相关字段的
/// 变体。缺失或类型不符的字段一律视为 `None`，不会导致解码失败。
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Pending {
        status: Option<String>,
        message: Option<String>,
        total: Option<u64>,
    },
    Progress {
        current: Option<u64>,
        total: Option<u64>,
        status: Option<String>,
        message: Option<String>,
    },
    Success {
        status: Option<String>,
        message: Option<String>,
        current: Option<u64>,
        total: Option<u64>,
        downloaded_count: Option<u64>,
        skipped_count: Option<u64>,
    },
    Failure {
        status: Option<String>,
        message: Option<String>,
    },
}

impl TaskResult {
    /// 从 worker 写入的原始对象按状态解码
    pub fn decode(state: TaskState, raw: &Map<String, Value>) -> Self {
        let status = string_field(raw, "status");
        let message = string_field(raw, "message");
        match state {
            TaskState::Progress => TaskResult::Progress {
                current: count_field(raw, "current"),
                total: count_field(raw, "total"),
                status,
                message,
            },
            TaskState::Success => TaskResult::Success {
                status,
                message,
                current: count_field(raw, "current"),
                total: count_field(raw, "total"),
                downloaded_count: count_field(raw, "downloaded_count"),
                skipped_count: count_field(raw, "skipped_count"),
            },
            TaskState::Failure => TaskResult::Failure { status, message },
            TaskState::Pending | TaskState::NotFound => TaskResult::Pending {
                status,
                message,
                total: count_field(raw, "total"),
            },
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            TaskResult::Pending { .. } => TaskState::Pending,
            TaskResult::Progress { .. } => TaskState::Progress,
            TaskResult::Success { .. } => TaskState::Success,
            TaskResult::Failure { .. } => TaskState::Failure,
        }
    }

    /// 人类可读的状态描述
    ///
    /// 依次取 `status`、`message` 中第一个非空值，否则使用状态默认文案。
    pub fn message(&self) -> String {
        let (status, message) = match self {
            TaskResult::Pending { status, message, .. }
            | TaskResult::Progress { status, message, .. }
            | TaskResult::Success { status, message, .. }
            | TaskResult::Failure { status, message } => (status, message),
        };
        first_non_empty([status.as_deref(), message.as_deref()])
            .unwrap_or_else(|| default_message(self.state()))
            .to_string()
    }

    /// `(current, total)` 进度计数
    pub fn progress(&self) -> (Option<u64>, Option<u64>) {
        match self {
            TaskResult::Progress { current, total, .. }
            | TaskResult::Success { current, total, .. } => (*current, *total),
            TaskResult::Pending { total, .. } => (None, *total),
            TaskResult::Failure { .. } => (None, None),
        }
    }
}

/// 各状态的默认描述文案
pub fn default_message(state: TaskState) -> &'static str {
    match state {
        TaskState::Pending => "Queued or running",
        TaskState::Progress => "Processing...",
        TaskState::Success => "Completed",
        TaskState::Failure => "Task failed",
        TaskState::NotFound => "Task not found",
    }
}

fn first_non_empty<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// 计数字段容忍整数、浮点数和数字字符串
fn count_field(raw: &Map<String, Value>, key: &str) -> Option<u64> {
    match raw.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 任务状态记录
///
/// 一个 task id 对应的最新状态快照。
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub state: TaskState,
    pub result: TaskResult,
    /// 原始结果对象，单任务查询时原样返回
    pub raw_result: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 存储中的线格式，和 worker 写入的格式一致
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl TaskRecord {
    pub fn new(state: TaskState, result: Map<String, Value>) -> Self {
        Self {
            state,
            result: TaskResult::decode(state, &result),
            raw_result: result,
            updated_at: Some(Utc::now()),
        }
    }

    /// 从存储中的 JSON 解码
    ///
    /// 外层结构损坏时返回 `None`（等同于记录不存在）；未知状态按 PENDING 处理。
    pub fn decode(raw: &str) -> Option<Self> {
        let stored: StoredRecord = serde_json::from_str(raw).ok()?;
        let state = match stored.status.parse::<TaskState>() {
            Ok(TaskState::NotFound) | Err(_) => TaskState::Pending,
            Ok(state) => state,
        };
        let raw_result = match stored.result {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let updated_at = stored
            .updated_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc));
        Some(Self {
            state,
            result: TaskResult::decode(state, &raw_result),
            raw_result,
            updated_at,
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let stored = StoredRecord {
            status: self.state.as_str().to_string(),
            result: Some(Value::Object(self.raw_result.clone())),
            updated_at: Some(
                self.updated_at
                    .unwrap_or_else(Utc::now)
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ),
        };
        serde_json::to_string(&stored)
    }

    pub fn message(&self) -> String {
        self.result.message()
    }

    /// 结果中携带的 task id（下载触发的 autotag 记录会带上）
    pub fn embedded_task_id(&self) -> Option<String> {
        string_field(&self.raw_result, "task_id").filter(|id| !id.trim().is_empty())
    }
}
