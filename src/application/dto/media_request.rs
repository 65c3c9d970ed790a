// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::tag_store::{ImageTag, TagCount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单个图片操作请求
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FilepathRequestDto {
    #[serde(default)]
    pub filepath: String,
}

/// 批量图片操作请求
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FilepathsRequestDto {
    #[serde(default)]
    pub filepaths: Vec<String>,
}

/// 删除用户请求
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserDeleteRequestDto {
    #[serde(default)]
    pub username: String,
}

/// 删除标签请求
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TagDeleteRequestDto {
    #[serde(default)]
    pub tag: String,
}

/// 删除标签响应
#[derive(Debug, Deserialize, Serialize)]
pub struct TagDeleteResponseDto {
    pub success: bool,
    pub message: String,
    pub tag: String,
    pub deleted_count: u64,
}

/// 标签计数响应
#[derive(Debug, Deserialize, Serialize)]
pub struct TagCountsResponseDto {
    pub tags: Vec<TagCount>,
}

/// 按文件查询标签的响应
#[derive(Debug, Deserialize, Serialize)]
pub struct FileTagsResponseDto {
    pub tags: HashMap<String, Vec<ImageTag>>,
}
