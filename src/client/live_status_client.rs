// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::client::reconnect::{ConnectionAction, ConnectionEvent, ReconnectMachine};
use crate::config::settings::LiveStatusSettings;
use crate::domain::models::status::{
    DownloadTaskStatus, LiveStatusPayload, StatusSummary, TaskStatus,
};
use futures::StreamExt;
use reqwest_eventsource::{retry, Event, EventSource};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 服务端推送的事件名
const STATUS_EVENT: &str = "status";

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Event source error: {0}")]
    EventSource(#[from] reqwest_eventsource::Error),

    /// 请求体是流，无法为事件源克隆请求
    #[error("Request cannot be cloned for the event source")]
    Request,
}

/// 本地状态视图
///
/// 每个负载整体替换旧状态，不做字段级合并。唯一的例外：某个 task id
/// 一旦显示过 SUCCESS/FAILURE，之后的负载不能让它退回 PENDING/PROGRESS。
#[derive(Debug, Default)]
pub struct LiveStatusView {
    current: Option<LiveStatusPayload>,
    finished_tasks: HashMap<String, TaskStatus>,
    finished_downloads: HashMap<String, DownloadTaskStatus>,
}

impl LiveStatusView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&LiveStatusPayload> {
        self.current.as_ref()
    }

    /// 应用一份新负载并返回当前视图
    pub fn apply(&mut self, mut payload: LiveStatusPayload) -> &LiveStatusPayload {
        pin_task(&mut payload.autotag, &mut self.finished_tasks);
        pin_task(&mut payload.retag, &mut self.finished_tasks);
        for item in payload.download.items.iter_mut() {
            pin_download(item, &mut self.finished_downloads);
        }
        if payload.download.status.is_none() {
            payload.download.summary =
                StatusSummary::tally(payload.download.items.iter().map(|item| &item.state));
        }

        // 只记住仍在视图中的任务
        let task_ids: HashSet<&str> = [&payload.autotag, &payload.retag]
            .into_iter()
            .filter_map(|status| status.task_id.as_deref())
            .collect();
        self.finished_tasks
            .retain(|id, _| task_ids.contains(id.as_str()));
        let download_ids: HashSet<&str> = payload
            .download
            .items
            .iter()
            .map(|item| item.task_id.as_str())
            .collect();
        self.finished_downloads
            .retain(|id, _| download_ids.contains(id.as_str()));

        self.current.insert(payload)
    }
}

fn pin_task(status: &mut TaskStatus, finished: &mut HashMap<String, TaskStatus>) {
    let Some(task_id) = status.task_id.clone() else {
        return;
    };
    if status.state.is_terminal() {
        finished.insert(task_id, status.clone());
    } else if let Some(previous) = finished.get(&task_id) {
        *status = previous.clone();
    }
}

fn pin_download(item: &mut DownloadTaskStatus, finished: &mut HashMap<String, DownloadTaskStatus>) {
    if item.state.is_terminal() {
        finished.insert(item.task_id.clone(), item.clone());
    } else if let Some(previous) = finished.get(&item.task_id) {
        *item = previous.clone();
    }
}

/// 实时状态客户端
///
/// 通过 `subscribe` 获得监听句柄；所有句柄释放后 `run` 返回。
pub struct LiveStatusClient {
    http: reqwest::Client,
    url: String,
    backoff: Duration,
    sender: watch::Sender<Option<LiveStatusPayload>>,
}

impl LiveStatusClient {
    /// 创建客户端
    ///
    /// # 参数
    ///
    /// * `base_url` - 服务端地址，例如 `http://127.0.0.1:5000`
    /// * `backoff` - 断线后的重连间隔
    pub fn new(base_url: &str, backoff: Duration) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/api/live/status", base_url.trim_end_matches('/')),
            backoff,
            sender,
        }
    }

    pub fn from_settings(base_url: &str, settings: &LiveStatusSettings) -> Self {
        Self::new(
            base_url,
            Duration::from_millis(settings.reconnect_backoff_ms),
        )
    }

    /// 注册一个监听者
    pub fn subscribe(&self) -> watch::Receiver<Option<LiveStatusPayload>> {
        self.sender.subscribe()
    }

    /// 连接并保持连接，直到没有监听者或被取消
    pub async fn run(&self, cancel: CancellationToken) {
        let mut machine = ReconnectMachine::new(self.backoff);
        let mut view = LiveStatusView::new();
        let mut action = machine.handle(ConnectionEvent::Listeners(self.sender.receiver_count()));

        loop {
            action = match action {
                ConnectionAction::Connect => {
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.sender.closed() => break,
                        outcome = self.stream_once(&mut machine, &mut view) => outcome,
                    };
                    if let Err(e) = outcome {
                        warn!(url = %self.url, error = %e, "Live status connection failed");
                    }
                    match self.sender.receiver_count() {
                        0 => machine.handle(ConnectionEvent::Listeners(0)),
                        _ => machine.handle(ConnectionEvent::Disconnected),
                    }
                }
                ConnectionAction::Wait(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Live status reconnect backoff");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    machine.resume(self.sender.receiver_count())
                }
                ConnectionAction::Stop | ConnectionAction::None => break,
            };
        }
        if self.sender.receiver_count() == 0 {
            machine.handle(ConnectionEvent::Listeners(0));
        }
        info!(state = ?machine.state(), "Live status client stopped");
    }

    /// 建立一次连接并消费到断开为止
    ///
    /// 重连由状态机负责，事件源自身的重试被关闭。
    async fn stream_once(
        &self,
        machine: &mut ReconnectMachine,
        view: &mut LiveStatusView,
    ) -> Result<(), ClientError> {
        let mut source =
            EventSource::new(self.http.get(&self.url)).map_err(|_| ClientError::Request)?;
        source.set_retry_policy(Box::new(retry::Never));

        let outcome = loop {
            let Some(event) = source.next().await else {
                break Ok(());
            };
            match event {
                Ok(Event::Open) => {
                    machine.handle(ConnectionEvent::Connected);
                    info!(url = %self.url, "Live status connection open");
                }
                Ok(Event::Message(message)) => self.handle_message(view, message),
                Err(reqwest_eventsource::Error::StreamEnded) => break Ok(()),
                Err(e) => break Err(e.into()),
            }
        };
        source.close();
        outcome
    }

    fn handle_message(&self, view: &mut LiveStatusView, message: eventsource_stream::Event) {
        if message.event != STATUS_EVENT {
            debug!(event = %message.event, "Ignoring live status event");
            return;
        }
        match serde_json::from_str::<LiveStatusPayload>(&message.data) {
            Ok(payload) => {
                let current = view.apply(payload).clone();
                self.sender.send_replace(Some(current));
            }
            Err(e) => warn!(error = %e, "Discarding malformed live status payload"),
        }
    }
}
