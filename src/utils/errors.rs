// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::tag_store::TagStoreError;
use crate::domain::repositories::task_store::StoreError;
use crate::queue::broker::BrokerError;
use crate::queue::submitter::SubmitError;
use thiserror::Error;

/// 服务层错误类型
///
/// 任务本身失败不属于错误，而是以 `FAILURE` 状态作为数据返回。
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 输入无效
    #[error("{0}")]
    Validation(String),

    /// 单例任务组正忙
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// 存储、broker 或外部服务不可达
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::UpstreamUnavailable(err.to_string())
    }
}

impl From<BrokerError> for ServiceError {
    fn from(err: BrokerError) -> Self {
        ServiceError::UpstreamUnavailable(err.to_string())
    }
}

impl From<TagStoreError> for ServiceError {
    fn from(err: TagStoreError) -> Self {
        ServiceError::UpstreamUnavailable(err.to_string())
    }
}

impl From<SubmitError> for ServiceError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Broker(e) => e.into(),
        }
    }
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("上游错误: {0}")]
    UpstreamError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}
