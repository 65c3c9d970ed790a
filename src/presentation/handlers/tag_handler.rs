// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::application::dto::media_request::{
    FileTagsResponseDto, FilepathsRequestDto, TagCountsResponseDto, TagDeleteRequestDto,
    TagDeleteResponseDto,
};
use crate::domain::repositories::tag_store::TagStore;
use crate::presentation::errors::AppError;
use crate::presentation::extractors::json_body::JsonBody;
use crate::utils::errors::ServiceError;
use crate::utils::url_utils::normalize_filepaths;

/// 所有标签及其出现次数
pub async fn tag_counts(
    Extension(tag_store): Extension<Arc<dyn TagStore>>,
) -> Result<Json<TagCountsResponseDto>, AppError> {
    let tags = tag_store.tag_counts().await.map_err(ServiceError::from)?;
    Ok(Json(TagCountsResponseDto { tags }))
}

/// 批量查询文件的标签
pub async fn tags_for_files(
    Extension(tag_store): Extension<Arc<dyn TagStore>>,
    JsonBody(payload): JsonBody<FilepathsRequestDto>,
) -> Result<Json<FileTagsResponseDto>, AppError> {
    let filepaths = normalize_filepaths(&payload.filepaths);
    if filepaths.is_empty() {
        return Err(ServiceError::Validation("filepaths is required".to_string()).into());
    }
    let tags = tag_store
        .tags_for_files(&filepaths)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(FileTagsResponseDto { tags }))
}

pub async fn delete_tag(
    Extension(tag_store): Extension<Arc<dyn TagStore>>,
    JsonBody(payload): JsonBody<TagDeleteRequestDto>,
) -> Result<Json<TagDeleteResponseDto>, AppError> {
    let tag = payload.tag.trim();
    if tag.is_empty() {
        return Err(ServiceError::Validation("tag is required".to_string()).into());
    }

    let deleted = tag_store.delete_tag(tag).await.map_err(ServiceError::from)?;
    info!(tag = %tag, deleted, "Tag deleted");
    Ok(Json(TagDeleteResponseDto {
        success: true,
        message: format!("Deleted tag '{}' from {} entries", tag, deleted),
        tag: tag.to_string(),
        deleted_count: deleted,
    }))
}
