// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据传输对象模块
///
/// 定义 HTTP 请求与响应的形状
pub mod download_request;
pub mod media_request;
pub mod task_request;
