// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json, Query};
use std::sync::Arc;

use crate::application::dto::download_request::{
    DownloadQueryDto, DownloadRequestDto, DownloadResponseDto,
};
use crate::application::use_cases::task_use_case::TaskUseCase;
use crate::domain::models::status::DownloadSummary;
use crate::domain::services::status_resolver::StatusResolver;
use crate::presentation::errors::AppError;
use crate::presentation::extractors::json_body::JsonBody;
use crate::utils::errors::ServiceError;

/// 批量提交下载任务
pub async fn queue_downloads(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
    JsonBody(payload): JsonBody<DownloadRequestDto>,
) -> Result<Json<DownloadResponseDto>, AppError> {
    let response = use_case.queue_downloads(payload).await?;
    Ok(Json(response))
}

/// 查询最近或指定下载任务的状态
pub async fn download_status(
    Extension(resolver): Extension<Arc<StatusResolver>>,
    Query(query): Query<DownloadQueryDto>,
) -> Result<Json<DownloadSummary>, AppError> {
    let summary = resolver
        .download_overview(query.ids.as_deref())
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(summary))
}
