// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// 每个处理器负责一组端点，只做参数提取和响应组装
pub mod autotag_handler;
pub mod download_handler;
pub mod live_status_handler;
pub mod media_handler;
pub mod tag_handler;
pub mod task_handler;
