// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 实时状态聚合工作器及其分发中心
pub mod live_status_hub;
pub mod live_status_worker;
pub mod worker;
