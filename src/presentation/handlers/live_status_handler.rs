// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tracing::warn;

use crate::config::settings::Settings;
use crate::domain::models::status::LiveStatusPayload;
use crate::workers::live_status_hub::LiveStatusHub;

/// SSE 事件名
pub const STATUS_EVENT: &str = "status";

/// 实时状态流
///
/// 连接后立即推送一份快照，之后按轮询间隔推送完整快照。
pub async fn live_status(
    Extension(hub): Extension<Arc<LiveStatusHub>>,
    Extension(settings): Extension<Arc<Settings>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = hub.subscribe();
    let first = Arc::new(hub.snapshot().await);

    let stream = futures::stream::once(async move { first })
        .chain(subscription.into_stream())
        .map(|payload| Ok(status_event(&payload)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(settings.live_status.keep_alive_secs.max(1)))
            .text("keep-alive"),
    )
}

fn status_event(payload: &LiveStatusPayload) -> Event {
    match Event::default().event(STATUS_EVENT).json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Failed to serialize live status payload");
            Event::default().comment("payload unavailable")
        }
    }
}
