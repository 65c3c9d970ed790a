// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json, Query};
use std::sync::Arc;

use crate::application::dto::task_request::TaskStatusQueryDto;
use crate::domain::models::status::TaskLookup;
use crate::domain::services::status_resolver::StatusResolver;
use crate::presentation::errors::AppError;
use crate::utils::errors::ServiceError;

/// 按 id 查询单个任务
///
/// 未知 id 返回 200 和 `NOT_FOUND` 状态，缺少 id 返回 400。
pub async fn task_status(
    Extension(resolver): Extension<Arc<StatusResolver>>,
    Query(query): Query<TaskStatusQueryDto>,
) -> Result<Json<TaskLookup>, AppError> {
    let task_id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::Validation("id is required".to_string()))?;

    let lookup = resolver.lookup(task_id).await.map_err(ServiceError::from)?;
    Ok(Json(lookup))
}
