// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::presentation::errors::AppError;
use crate::utils::errors::ServiceError;

/// JSON 请求体
///
/// 与 `Json` 相同，但任何解析失败（类型错误、语法错误、缺少
/// Content-Type）都统一返回 400 和 `{"success": false, "error": ..}`。
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let detail = rejection.body_text();
                debug!(status = %rejection.status(), error = %detail, "Rejected request body");
                Err(ServiceError::Validation(format!("Invalid request body: {}", detail)).into())
            }
        }
    }
}
