// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::task_use_case::TaskUseCase;
use crate::config::settings::Settings;
use crate::domain::repositories::tag_store::TagStore;
use crate::domain::services::status_resolver::StatusResolver;
use crate::presentation::handlers::{
    autotag_handler, download_handler, live_status_handler, media_handler, tag_handler,
    task_handler,
};
use crate::workers::live_status_hub::LiveStatusHub;
use axum::{
    http::HeaderName,
    routing::{delete, get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// 路由依赖的共享服务
#[derive(Clone)]
pub struct AppServices {
    pub resolver: Arc<StatusResolver>,
    pub use_case: Arc<TaskUseCase>,
    pub hub: Arc<LiveStatusHub>,
    pub tag_store: Arc<dyn TagStore>,
    pub settings: Arc<Settings>,
}

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/version", get(version));

    let task_routes = Router::new()
        .route(
            "/api/download",
            post(download_handler::queue_downloads).get(download_handler::download_status),
        )
        .route("/api/tasks/status", get(task_handler::task_status))
        .route("/api/autotag/reload", post(autotag_handler::reload))
        .route("/api/autotag/untagged", post(autotag_handler::untagged))
        .route("/api/autotag/reconcile", post(autotag_handler::reconcile))
        .route("/api/autotag/status", get(autotag_handler::autotag_status))
        .route("/api/retag/status", get(autotag_handler::retag_status))
        .route("/api/live/status", get(live_status_handler::live_status));

    let media_routes = Router::new()
        .route("/api/images", delete(media_handler::delete_image))
        .route("/api/images/delete", post(media_handler::delete_images))
        .route("/api/images/retag", post(media_handler::retag_image))
        .route("/api/images/retag_bulk", post(media_handler::retag_images))
        .route("/api/users", delete(media_handler::delete_user))
        .route(
            "/api/tags",
            get(tag_handler::tag_counts).delete(tag_handler::delete_tag),
        )
        .route("/api/tags/files", post(tag_handler::tags_for_files));

    Router::new()
        .merge(public_routes)
        .merge(task_routes)
        .merge(media_routes)
}

/// 组装完整应用：路由、依赖注入与请求跟踪
pub fn build_app(services: AppServices) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    routes()
        .layer(Extension(services.resolver))
        .layer(Extension(services.use_case))
        .layer(Extension(services.hub))
        .layer(Extension(services.tag_store))
        .layer(Extension(services.settings))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
