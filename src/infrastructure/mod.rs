// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 领域层存储接口的具体实现，以及 Redis 连接、SQLite 连接池和指标导出。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis 客户端
/// - 数据库（database）：标签索引的连接池与迁移
/// - 指标（metrics）：Prometheus 导出
/// - 仓库实现（repositories）：任务存储和标签索引
pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
