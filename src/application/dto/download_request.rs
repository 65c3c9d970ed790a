// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::queue::submitter::QueuedTask;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 批量下载请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct DownloadRequestDto {
    #[validate(length(min = 1, message = "URL list is required"))]
    #[serde(default)]
    pub urls: Vec<String>,
}

/// 批量下载响应
#[derive(Debug, Deserialize, Serialize)]
pub struct DownloadResponseDto {
    pub success: bool,
    pub message: String,
    pub queued_tasks: Vec<QueuedTask>,
}

/// 下载状态查询参数
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DownloadQueryDto {
    /// 逗号分隔的 task id
    pub ids: Option<String>,
}
