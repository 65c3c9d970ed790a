// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 单任务查询参数
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TaskStatusQueryDto {
    pub id: Option<String>,
}

/// 触发单例任务的响应
#[derive(Debug, Deserialize, Serialize)]
pub struct TriggerResponseDto {
    pub success: bool,
    pub message: String,
    pub task_id: String,
}

/// 交互任务入队响应（202）
#[derive(Debug, Deserialize, Serialize)]
pub struct QueuedResponseDto {
    pub success: bool,
    pub queued: bool,
    pub task_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_count: Option<usize>,
}

impl QueuedResponseDto {
    pub fn new(task_id: String, message: impl Into<String>) -> Self {
        Self {
            success: true,
            queued: true,
            task_id,
            message: message.into(),
            queued_count: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.queued_count = Some(count);
        self
    }
}
