// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 请求校验、载荷构造以及面向 HTTP 层的用例
pub mod dto;
pub mod use_cases;
