// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json};
use std::sync::Arc;

use crate::application::dto::task_request::TriggerResponseDto;
use crate::application::use_cases::task_use_case::{AutotagTrigger, TaskUseCase};
use crate::domain::models::status::TaskStatus;
use crate::domain::models::task::SingletonGroup;
use crate::domain::services::status_resolver::StatusResolver;
use crate::presentation::errors::AppError;
use crate::utils::errors::ServiceError;

/// 强制重新标注全部图片
pub async fn reload(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
) -> Result<Json<TriggerResponseDto>, AppError> {
    Ok(Json(use_case.trigger_autotag(AutotagTrigger::Reload).await?))
}

/// 标注未标注的图片
pub async fn untagged(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
) -> Result<Json<TriggerResponseDto>, AppError> {
    Ok(Json(use_case.trigger_autotag(AutotagTrigger::Untagged).await?))
}

/// 数据库一致性检查
pub async fn reconcile(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
) -> Result<Json<TriggerResponseDto>, AppError> {
    Ok(Json(use_case.trigger_autotag(AutotagTrigger::Reconcile).await?))
}

/// 统一的 autotag 状态（手动触发与下载触发合并）
pub async fn autotag_status(
    Extension(resolver): Extension<Arc<StatusResolver>>,
) -> Result<Json<TaskStatus>, AppError> {
    let status = resolver
        .unified_autotag()
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(status))
}

/// 最近一次批量重新标注的状态
pub async fn retag_status(
    Extension(resolver): Extension<Arc<StatusResolver>>,
) -> Result<Json<TaskStatus>, AppError> {
    let status = resolver
        .resolve_singleton(SingletonGroup::Retag)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(status))
}
