// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskFamily;
use crate::domain::services::status_resolver::StatusResolver;
use crate::queue::submitter::{initial_payload, JobSubmitter};
use crate::utils::errors::ServiceError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// 单例任务守卫
///
/// 提交前检查同组最近一次任务是否仍在运行。这是建议性的检查而不是分布式锁：
/// 两个几乎同时到达的提交可能都通过检查。被保护的任务昂贵、由管理员触发且很少
/// 并发，这个窗口是已知并接受的。
pub struct SingletonGuard {
    resolver: Arc<StatusResolver>,
    submitter: Arc<JobSubmitter>,
}

impl SingletonGuard {
    pub fn new(resolver: Arc<StatusResolver>, submitter: Arc<JobSubmitter>) -> Self {
        Self {
            resolver,
            submitter,
        }
    }

    /// 提交单例任务
    ///
    /// # 参数
    ///
    /// * `family` - 属于某个单例组的任务族
    /// * `payload` - 发送给 worker 的载荷
    /// * `total` - 批量任务的条目数
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 新任务 id
    /// * `Err(ServiceError::Conflict)` - 同组已有任务在运行，未创建任何任务
    pub async fn enqueue_singleton(
        &self,
        family: TaskFamily,
        payload: Value,
        total: Option<usize>,
    ) -> Result<String, ServiceError> {
        let Some(group) = family.singleton_group() else {
            return Err(ServiceError::Validation(format!(
                "{} is not a singleton task",
                family
            )));
        };

        if self.resolver.is_busy(group).await? {
            warn!(task_type = %family, group = %group, "Rejecting submission, group is busy");
            return Err(ServiceError::Conflict(conflict_message(family).to_string()));
        }

        let task_id = self
            .submitter
            .submit(family, payload, initial_payload(family, total))
            .await?;
        info!(task_id = %task_id, task_type = %family, "Singleton task queued");
        Ok(task_id)
    }
}

fn conflict_message(family: TaskFamily) -> &'static str {
    match family {
        TaskFamily::Retag => "Another bulk retag task is already running.",
        _ => "Another autotag task is already running.",
    }
}
