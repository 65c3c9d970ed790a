// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 未启用时不安装 recorder，所有指标调用都会成为空操作。
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_counter!("xmdq_tasks_enqueued_total", "Tasks enqueued, by task type");
    describe_counter!("xmdq_enqueue_failures_total", "Enqueue failures, by task type");
    describe_counter!("xmdq_invalid_urls_total", "Download URLs dropped by validation");
    describe_counter!("xmdq_live_status_ticks_total", "Live status aggregation ticks");
    describe_counter!(
        "xmdq_live_status_fetch_failures_total",
        "Per-family fetch failures during aggregation"
    );
    describe_gauge!("xmdq_live_status_subscribers", "Connected live status subscribers");

    info!("Metrics exporter listening on {}", addr);
}
