// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的具体实现：Redis 任务存储和 SQLite 标签索引
pub mod redis_task_store;
pub mod sqlite_tag_store;
