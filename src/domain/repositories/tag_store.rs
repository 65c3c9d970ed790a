// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// 标签索引错误类型
#[derive(Error, Debug)]
pub enum TagStoreError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// 文件上的一个标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTag {
    pub tag: String,
    pub confidence: f64,
}

/// 标签及其出现次数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// 标签索引特质
///
/// 只暴露本服务需要的窄接口，标签的写入由 worker 负责。
#[async_trait]
pub trait TagStore: Send + Sync {
    /// 批量获取文件的标签，按置信度降序；未命中的文件映射到空列表
    async fn tags_for_files(
        &self,
        filepaths: &[String],
    ) -> Result<HashMap<String, Vec<ImageTag>>, TagStoreError>;

    /// 所有标签的计数，按次数降序、标签名升序
    async fn tag_counts(&self) -> Result<Vec<TagCount>, TagStoreError>;

    /// 删除一个标签，返回受影响的行数
    async fn delete_tag(&self, tag: &str) -> Result<u64, TagStoreError>;

    async fn delete_tags_for_file(&self, filepath: &str) -> Result<u64, TagStoreError>;

    /// 删除某个用户目录下所有文件的标签
    async fn delete_tags_for_user(&self, username: &str) -> Result<u64, TagStoreError>;
}
