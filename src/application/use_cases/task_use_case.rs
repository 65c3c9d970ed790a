// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::download_request::{DownloadRequestDto, DownloadResponseDto};
use crate::application::dto::task_request::{QueuedResponseDto, TriggerResponseDto};
use crate::domain::models::task::TaskFamily;
use crate::queue::singleton_guard::SingletonGuard;
use crate::queue::submitter::{initial_payload, JobSubmitter};
use crate::utils::errors::ServiceError;
use crate::utils::url_utils::{is_valid_username, normalize_filepath, normalize_filepaths};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// 触发 autotag 组任务的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutotagTrigger {
    /// 强制重新标注全部图片
    Reload,
    /// 只标注未标注的图片
    Untagged,
    /// 数据库一致性检查
    Reconcile,
}

impl AutotagTrigger {
    fn family(&self) -> TaskFamily {
        match self {
            AutotagTrigger::Reload => TaskFamily::AutotagAll,
            AutotagTrigger::Untagged => TaskFamily::AutotagUntagged,
            AutotagTrigger::Reconcile => TaskFamily::ReconcileDb,
        }
    }

    fn started_message(&self) -> &'static str {
        match self {
            AutotagTrigger::Reload => "Started force re-tagging for ALL images in the background.",
            AutotagTrigger::Untagged => "Autotagging for untagged images started in the background.",
            AutotagTrigger::Reconcile => "Started DB consistency check and cleanup in the background.",
        }
    }

    fn requires_autotagger(&self) -> bool {
        !matches!(self, AutotagTrigger::Reconcile)
    }
}

/// 任务提交用例
///
/// 校验请求、构造 worker 载荷，再交给提交器或单例守卫。
pub struct TaskUseCase {
    submitter: Arc<JobSubmitter>,
    guard: Arc<SingletonGuard>,
    autotagger_configured: bool,
}

impl TaskUseCase {
    pub fn new(
        submitter: Arc<JobSubmitter>,
        guard: Arc<SingletonGuard>,
        autotagger_configured: bool,
    ) -> Self {
        Self {
            submitter,
            guard,
            autotagger_configured,
        }
    }

    /// 批量提交下载任务
    ///
    /// 无效 URL 被静默丢弃，响应只报告成功入队的部分。
    pub async fn queue_downloads(
        &self,
        request: DownloadRequestDto,
    ) -> Result<DownloadResponseDto, ServiceError> {
        if request.validate().is_err() || request.urls.iter().all(|u| u.trim().is_empty()) {
            return Err(ServiceError::Validation("URL list is required".to_string()));
        }

        let batch = self.submitter.submit_downloads(&request.urls).await;
        Ok(DownloadResponseDto {
            success: true,
            message: format!("{} download tasks have been queued.", batch.queued.len()),
            queued_tasks: batch.queued,
        })
    }

    /// 触发 autotag 组任务
    pub async fn trigger_autotag(
        &self,
        trigger: AutotagTrigger,
    ) -> Result<TriggerResponseDto, ServiceError> {
        if trigger.requires_autotagger() && !self.autotagger_configured {
            return Err(ServiceError::Validation(
                "Autotagger is not configured.".to_string(),
            ));
        }

        let task_id = self
            .guard
            .enqueue_singleton(trigger.family(), json!({}), None)
            .await?;
        Ok(TriggerResponseDto {
            success: true,
            message: trigger.started_message().to_string(),
            task_id,
        })
    }

    pub async fn delete_user(&self, username: &str) -> Result<QueuedResponseDto, ServiceError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(ServiceError::Validation("Invalid username".to_string()));
        }

        let task_id = self
            .submitter
            .submit(
                TaskFamily::DeleteUser,
                json!({ "username": username }),
                initial_payload(TaskFamily::DeleteUser, None),
            )
            .await?;
        info!(task_id = %task_id, username = %username, "Delete user task queued");
        Ok(QueuedResponseDto::new(task_id, "Delete user task queued"))
    }

    pub async fn delete_image(&self, filepath: &str) -> Result<QueuedResponseDto, ServiceError> {
        let filepath = require_filepath(filepath)?;
        let task_id = self
            .submitter
            .submit(
                TaskFamily::DeleteImage,
                json!({ "filepath": filepath }),
                initial_payload(TaskFamily::DeleteImage, None),
            )
            .await?;
        info!(task_id = %task_id, filepath = %filepath, "Delete image task queued");
        Ok(QueuedResponseDto::new(task_id, "Delete image task queued"))
    }

    pub async fn delete_images(
        &self,
        filepaths: &[String],
    ) -> Result<QueuedResponseDto, ServiceError> {
        let filepaths = require_filepaths(filepaths)?;
        let count = filepaths.len();
        let task_id = self
            .submitter
            .submit(
                TaskFamily::BulkDelete,
                json!({ "filepaths": filepaths }),
                initial_payload(TaskFamily::BulkDelete, Some(count)),
            )
            .await?;
        info!(task_id = %task_id, count, "Bulk delete image task queued");
        Ok(QueuedResponseDto::new(task_id, "Bulk delete image task queued").with_count(count))
    }

    pub async fn retag_image(&self, filepath: &str) -> Result<QueuedResponseDto, ServiceError> {
        let filepath = require_filepath(filepath)?;
        let task_id = self
            .submitter
            .submit(
                TaskFamily::RetagImage,
                json!({ "filepath": filepath }),
                initial_payload(TaskFamily::RetagImage, None),
            )
            .await?;
        info!(task_id = %task_id, filepath = %filepath, "Retag image task queued");
        Ok(QueuedResponseDto::new(task_id, "Retag task queued"))
    }

    /// 批量重新标注，同一时刻只允许一个
    pub async fn retag_images(
        &self,
        filepaths: &[String],
    ) -> Result<QueuedResponseDto, ServiceError> {
        let filepaths = require_filepaths(filepaths)?;
        let count = filepaths.len();
        let task_id = self
            .guard
            .enqueue_singleton(
                TaskFamily::Retag,
                json!({ "filepaths": filepaths }),
                Some(count),
            )
            .await?;
        Ok(QueuedResponseDto::new(task_id, "Bulk retag task queued").with_count(count))
    }
}

fn require_filepath(raw: &str) -> Result<String, ServiceError> {
    normalize_filepath(raw).ok_or_else(|| ServiceError::Validation("filepath is required".to_string()))
}

fn require_filepaths(raw: &[String]) -> Result<Vec<String>, ServiceError> {
    let filepaths = normalize_filepaths(raw);
    if filepaths.is_empty() {
        return Err(ServiceError::Validation("filepaths is required".to_string()));
    }
    Ok(filepaths)
}
