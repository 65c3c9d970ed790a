// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::status::{DownloadSummary, LiveStatusPayload, Locks, TaskStatus};
use crate::domain::models::task::SingletonGroup;
use crate::domain::services::status_resolver::{select_unified, StatusResolver};
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 实时状态聚合器
///
/// 一次 tick 内并行读取所有任务族，任何一个读取失败只影响对应字段。
pub struct LiveStatusAggregator {
    resolver: Arc<StatusResolver>,
}

impl LiveStatusAggregator {
    pub fn new(resolver: Arc<StatusResolver>) -> Self {
        Self { resolver }
    }

    /// 计算一份完整快照
    pub async fn snapshot(&self) -> LiveStatusPayload {
        let (manual, implicit, retag, download) = tokio::join!(
            self.resolver.resolve_singleton(SingletonGroup::Autotag),
            self.resolver.implicit_autotag(),
            self.resolver.resolve_singleton(SingletonGroup::Retag),
            self.resolver.download_overview(None),
        );

        let manual = manual.unwrap_or_else(|e| placeholder("autotag", &e));
        let implicit = implicit.unwrap_or_else(|e| {
            fetch_failed("autotag_download", &e);
            None
        });
        let retag = retag.unwrap_or_else(|e| placeholder("retag", &e));
        let download = download.unwrap_or_else(|e| {
            fetch_failed("download", &e);
            DownloadSummary::unavailable()
        });

        let locks = Locks {
            autotag_busy: manual.state.is_active(),
            retag_busy: retag.state.is_active(),
        };

        LiveStatusPayload {
            autotag: select_unified(manual, implicit),
            retag,
            download,
            locks,
            timestamp: Utc::now(),
        }
    }
}

fn placeholder(family: &'static str, err: &dyn std::fmt::Display) -> TaskStatus {
    fetch_failed(family, err);
    TaskStatus::unavailable()
}

fn fetch_failed(family: &'static str, err: &dyn std::fmt::Display) {
    warn!(family = family, error = %err, "Live status fetch failed");
    metrics::counter!("xmdq_live_status_fetch_failures_total", "family" => family).increment(1);
}

/// 实时状态工作器
///
/// 每个进程同一时刻最多一个实例，按固定间隔聚合并广播快照，直到被取消。
pub struct LiveStatusWorker {
    aggregator: Arc<LiveStatusAggregator>,
    sender: broadcast::Sender<Arc<LiveStatusPayload>>,
    interval: Duration,
    cancel: CancellationToken,
}

impl LiveStatusWorker {
    pub fn new(
        aggregator: Arc<LiveStatusAggregator>,
        sender: broadcast::Sender<Arc<LiveStatusPayload>>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            aggregator,
            sender,
            interval,
            cancel,
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("{} worker exited with error: {}", self.name(), e);
            }
        })
    }
}

#[async_trait]
impl Worker for LiveStatusWorker {
    async fn run(&self) -> Result<(), WorkerError> {
        if self.interval.is_zero() {
            return Err(WorkerError::InternalError(
                "poll interval must be positive".to_string(),
            ));
        }
        info!("Live status worker started");

        // 订阅者连接时已经拿到首个快照，这里从一个间隔之后开始
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let payload = tokio::select! {
                _ = self.cancel.cancelled() => break,
                payload = self.aggregator.snapshot() => payload,
            };
            metrics::counter!("xmdq_live_status_ticks_total").increment(1);

            // 没有接收者时发送失败，下一次取消检查会退出
            match self.sender.send(Arc::new(payload)) {
                Ok(receivers) => debug!(receivers, "Live status broadcast"),
                Err(_) => debug!("Live status broadcast without receivers"),
            }
        }

        info!("Live status worker stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "live_status"
    }
}
