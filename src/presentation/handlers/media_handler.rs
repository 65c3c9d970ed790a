// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use std::sync::Arc;

use crate::application::dto::media_request::{
    FilepathRequestDto, FilepathsRequestDto, UserDeleteRequestDto,
};
use crate::application::dto::task_request::QueuedResponseDto;
use crate::application::use_cases::task_use_case::TaskUseCase;
use crate::presentation::errors::AppError;
use crate::presentation::extractors::json_body::JsonBody;

type Accepted = (StatusCode, Json<QueuedResponseDto>);

fn accepted(response: QueuedResponseDto) -> Accepted {
    (StatusCode::ACCEPTED, Json(response))
}

pub async fn delete_image(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
    JsonBody(payload): JsonBody<FilepathRequestDto>,
) -> Result<Accepted, AppError> {
    Ok(accepted(use_case.delete_image(&payload.filepath).await?))
}

pub async fn delete_images(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
    JsonBody(payload): JsonBody<FilepathsRequestDto>,
) -> Result<Accepted, AppError> {
    Ok(accepted(use_case.delete_images(&payload.filepaths).await?))
}

pub async fn retag_image(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
    JsonBody(payload): JsonBody<FilepathRequestDto>,
) -> Result<Accepted, AppError> {
    Ok(accepted(use_case.retag_image(&payload.filepath).await?))
}

/// 批量重新标注；已有批量任务运行时返回 409
pub async fn retag_images(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
    JsonBody(payload): JsonBody<FilepathsRequestDto>,
) -> Result<Accepted, AppError> {
    Ok(accepted(use_case.retag_images(&payload.filepaths).await?))
}

pub async fn delete_user(
    Extension(use_case): Extension<Arc<TaskUseCase>>,
    JsonBody(payload): JsonBody<UserDeleteRequestDto>,
) -> Result<Accepted, AppError> {
    Ok(accepted(use_case.delete_user(&payload.username).await?))
}
