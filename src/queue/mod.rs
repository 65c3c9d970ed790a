// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供任务 broker、任务提交和单例任务守卫
pub mod broker;
pub mod singleton_guard;
pub mod submitter;
