// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::status::LiveStatusPayload;
use crate::workers::live_status_worker::{LiveStatusAggregator, LiveStatusWorker};
use futures::Stream;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 实时状态分发中心
///
/// 第一个订阅者到来时启动聚合工作器，最后一个订阅者离开时取消它。
/// 所有订阅者共享同一份快照，上游负载与订阅者数量无关。
pub struct LiveStatusHub {
    aggregator: Arc<LiveStatusAggregator>,
    sender: broadcast::Sender<Arc<LiveStatusPayload>>,
    interval: Duration,
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    subscribers: usize,
    cancel: Option<CancellationToken>,
    /// 每次启动工作器递增，用于识别已退出的是哪一次运行
    generation: u64,
}

impl LiveStatusHub {
    /// 创建分发中心
    ///
    /// # 参数
    ///
    /// * `aggregator` - 快照聚合器
    /// * `interval` - 轮询间隔
    /// * `capacity` - 广播通道容量，落后太多的订阅者会跳过旧快照
    pub fn new(aggregator: Arc<LiveStatusAggregator>, interval: Duration, capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            aggregator,
            sender,
            interval,
            state: Mutex::new(HubState::default()),
        })
    }

    /// 立即计算一份快照（新连接的首个消息）
    pub async fn snapshot(&self) -> LiveStatusPayload {
        self.aggregator.snapshot().await
    }

    /// 订阅后续快照
    pub fn subscribe(self: &Arc<Self>) -> LiveStatusSubscription {
        let mut state = self.state.lock();
        let receiver = self.sender.subscribe();
        state.subscribers += 1;
        metrics::gauge!("xmdq_live_status_subscribers").set(state.subscribers as f64);

        if state.cancel.is_none() {
            let token = CancellationToken::new();
            let handle = LiveStatusWorker::new(
                Arc::clone(&self.aggregator),
                self.sender.clone(),
                self.interval,
                token.clone(),
            )
            .start();
            state.generation += 1;
            state.cancel = Some(token);
            info!("Live status aggregation started");

            let hub = Arc::downgrade(self);
            let generation = state.generation;
            tokio::spawn(async move {
                let _ = handle.await;
                Self::worker_exited(hub, generation);
            });
        }
        debug!(subscribers = state.subscribers, "Live status subscriber joined");

        LiveStatusSubscription {
            hub: Arc::clone(self),
            receiver,
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.subscribers = state.subscribers.saturating_sub(1);
        metrics::gauge!("xmdq_live_status_subscribers").set(state.subscribers as f64);
        debug!(subscribers = state.subscribers, "Live status subscriber left");

        if state.subscribers == 0 {
            if let Some(token) = state.cancel.take() {
                token.cancel();
                info!("Live status aggregation stopped");
            }
        }
    }

    /// 工作器自行退出（而非被取消）时清除运行标记，下一个订阅者会重新启动它
    fn worker_exited(hub: Weak<Self>, generation: u64) {
        let Some(hub) = hub.upgrade() else {
            return;
        };
        let mut state = hub.state.lock();
        if state.generation != generation {
            return;
        }
        if let Some(token) = state.cancel.take() {
            if !token.is_cancelled() {
                warn!("Live status aggregation exited unexpectedly");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers
    }

    /// 聚合工作器是否在运行
    pub fn is_running(&self) -> bool {
        self.state.lock().cancel.is_some()
    }
}

/// 一个订阅者
///
/// 释放时自动从分发中心注销。
pub struct LiveStatusSubscription {
    hub: Arc<LiveStatusHub>,
    receiver: broadcast::Receiver<Arc<LiveStatusPayload>>,
}

impl LiveStatusSubscription {
    /// 等待下一份快照；落后的订阅者直接跳到最新
    pub async fn recv(&mut self) -> Option<Arc<LiveStatusPayload>> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Live status subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Arc<LiveStatusPayload>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let payload = subscription.recv().await?;
            Some((payload, subscription))
        })
    }
}

impl Drop for LiveStatusSubscription {
    fn drop(&mut self) {
        self.hub.release();
    }
}
