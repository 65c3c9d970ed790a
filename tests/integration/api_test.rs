// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, create_test_app_with};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Value};
use xmdq::domain::models::status::QueueCounters;
use xmdq::domain::models::task::{SingletonGroup, TaskState};

/// 提交下载后立即查询，任务处于 PENDING
#[tokio::test]
async fn test_download_submit_then_pending() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/download")
        .json(&json!({ "urls": ["https://x.com/u/status/123", "not-a-url"] }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("1 download tasks have been queued."));
    let queued = body["queued_tasks"].as_array().expect("queued tasks");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0]["url"], json!("https://x.com/u/status/123"));

    let task_id = queued[0]["task_id"].as_str().expect("task id").to_string();
    let status = app
        .server
        .get("/api/tasks/status")
        .add_query_param("id", &task_id)
        .await;
    status.assert_status_ok();
    let status: Value = status.json();
    assert_eq!(status["task_id"], json!(task_id));
    assert_eq!(status["state"], json!("PENDING"));
}

#[tokio::test]
async fn test_download_requires_urls() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/download")
        .json(&json!({ "urls": [] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("URL list is required"));

    let response = app.server.post("/api/download").json(&json!({})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

/// 类型错误或非 JSON 的请求体返回 400 而不是 422/415
#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/download")
        .json(&json!({ "urls": "https://x.com/u/status/1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let response = app
        .server
        .post("/api/download")
        .text("urls=https://x.com/u/status/1")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));

    let response = app
        .server
        .post("/api/images/retag")
        .json(&json!({ "filepath": 42 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(app.broker.messages().is_empty());
}

#[tokio::test]
async fn test_download_all_invalid_reports_zero() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/download")
        .json(&json!({ "urls": ["ftp://x.com/u/status/1", "https://example.com/u/status/1"] }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], json!("0 download tasks have been queued."));
    assert!(app.broker.messages().is_empty());
}

#[tokio::test]
async fn test_download_overview() {
    let app = create_test_app().await;
    app.broker.set_counters(QueueCounters {
        pending: 2,
        active: 1,
        scheduled: 0,
        retry: 1,
    });

    let response = app
        .server
        .post("/api/download")
        .json(&json!({ "urls": ["https://x.com/a/status/1", "https://twitter.com/b/status/2"] }))
        .await;
    let body: Value = response.json();
    let first = body["queued_tasks"][0]["task_id"].as_str().unwrap().to_string();
    let second = body["queued_tasks"][1]["task_id"].as_str().unwrap().to_string();
    app.store.write(
        &first,
        TaskState::Success,
        json!({ "message": "Downloaded 4 files", "downloaded_count": 4 }),
    );

    let overview: Value = app.server.get("/api/download").await.json();
    assert_eq!(overview["queue_depth"], json!(4));
    assert_eq!(overview["summary"]["total"], json!(2));
    assert_eq!(overview["summary"]["pending"], json!(1));
    assert_eq!(overview["summary"]["success"], json!(1));

    // 最新的任务排在最前
    let items = overview["items"].as_array().unwrap();
    assert_eq!(items[0]["task_id"], json!(second));
    assert_eq!(items[0]["url"], json!("https://twitter.com/b/status/2"));
    assert_eq!(items[1]["task_id"], json!(first));
    assert_eq!(items[1]["state"], json!("SUCCESS"));
    assert_eq!(items[1]["message"], json!("Downloaded 4 files"));
    assert_eq!(items[1]["downloaded_count"], json!(4));

    // 显式 id 列表，重复和空白被忽略
    let selected: Value = app
        .server
        .get("/api/download")
        .add_query_param("ids", format!("{first},,{first}"))
        .await
        .json();
    assert_eq!(selected["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_download_overview_degrades() {
    let app = create_test_app().await;
    app.broker.set_fail_counters(true);

    let response = app.server.get("/api/download").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["queue_depth"], json!(0));

    app.store.set_fail_reads(true);
    let response = app.server.get("/api/download").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_task_status_requires_id_and_reports_unknown() {
    let app = create_test_app().await;

    let response = app.server.get("/api/tasks/status").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("id is required"));

    let response = app
        .server
        .get("/api/tasks/status")
        .add_query_param("id", "missing")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], json!("NOT_FOUND"));
    assert_eq!(body["message"], json!("Task not found"));
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn test_task_status_returns_raw_result() {
    let app = create_test_app().await;
    app.store.write(
        "t-1",
        TaskState::Failure,
        json!({ "message": "Gallery extractor crashed", "code": 3 }),
    );

    let body: Value = app
        .server
        .get("/api/tasks/status")
        .add_query_param("id", "t-1")
        .await
        .json();
    assert_eq!(body["state"], json!("FAILURE"));
    assert_eq!(body["message"], json!("Gallery extractor crashed"));
    assert_eq!(body["result"]["code"], json!(3));
}

/// 单例任务忙碌时拒绝提交，完成后可再次提交
#[tokio::test]
async fn test_autotag_busy_guard() {
    let app = create_test_app().await;

    let response = app.server.post("/api/autotag/reload").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let task_id = body["task_id"].as_str().unwrap().to_string();
    assert_eq!(
        body["message"],
        json!("Started force re-tagging for ALL images in the background.")
    );
    assert_eq!(app.store.singleton(SingletonGroup::Autotag), Some(task_id.clone()));

    let response = app.server.post("/api/autotag/untagged").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Another autotag task is already running."));
    assert_eq!(app.broker.messages().len(), 1);
    assert_eq!(app.store.singleton(SingletonGroup::Autotag), Some(task_id.clone()));

    app.store.write(
        &task_id,
        TaskState::Progress,
        json!({ "current": 5, "total": 20 }),
    );
    let response = app.server.post("/api/autotag/reconcile").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    app.store
        .write(&task_id, TaskState::Success, json!({ "message": "Tagged 20 images" }));
    let response = app.server.post("/api/autotag/untagged").await;
    response.assert_status_ok();
    assert_eq!(app.broker.messages().len(), 2);
}

#[tokio::test]
async fn test_autotag_requires_configured_autotagger() {
    let app = create_test_app_with(false).await;

    let response = app.server.post("/api/autotag/reload").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Autotagger is not configured."));
    assert!(app.broker.messages().is_empty());

    let response = app.server.post("/api/autotag/reconcile").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_autotag_status() {
    let app = create_test_app().await;

    let body: Value = app.server.get("/api/autotag/status").await.json();
    assert_eq!(body["state"], json!("NOT_FOUND"));
    assert_eq!(body["status"], json!("No autotagging task has been run yet."));

    let trigger: Value = app.server.post("/api/autotag/reload").await.json();
    let task_id = trigger["task_id"].as_str().unwrap().to_string();
    app.store.write(
        &task_id,
        TaskState::Progress,
        json!({ "current": 3, "total": 10, "status": "Tagging 3/10" }),
    );

    let body: Value = app.server.get("/api/autotag/status").await.json();
    assert_eq!(body["state"], json!("PROGRESS"));
    assert_eq!(body["status"], json!("Tagging 3/10"));
    assert_eq!(body["current"], json!(3));
    assert_eq!(body["total"], json!(10));
    assert_eq!(body["source"], json!("manual"));

    // 手动任务完成后，下载触发的运行优先级更高
    app.store.write(&task_id, TaskState::Success, json!({}));
    app.store.write_download_autotag(
        TaskState::Progress,
        json!({ "task_id": "dl-run", "current": 1, "total": 2 }),
    );
    let body: Value = app.server.get("/api/autotag/status").await.json();
    assert_eq!(body["state"], json!("PROGRESS"));
    assert_eq!(body["task_id"], json!("dl-run"));
    assert_eq!(body["source"], json!("download"));
}

#[tokio::test]
async fn test_interactive_tasks_are_accepted() {
    let app = create_test_app().await;

    let response = app
        .server
        .delete("/api/images")
        .json(&json!({ "filepath": "\\alice\\a.jpg" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["queued"], json!(true));
    assert_eq!(body["message"], json!("Delete image task queued"));

    let messages = app.broker.messages();
    let (message, options) = messages.last().unwrap();
    assert_eq!(message.task_type, "xmd:delete_image");
    assert_eq!(message.payload, json!({ "filepath": "alice/a.jpg" }));
    assert_eq!(options.queue, "interactive");
    assert_eq!(options.max_retry, 0);

    let response = app
        .server
        .post("/api/images/delete")
        .json(&json!({ "filepaths": ["a/1.jpg", "a/2.jpg", "a/1.jpg"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["queued_count"], json!(2));
    let task_id = body["task_id"].as_str().unwrap();
    let lookup: Value = app
        .server
        .get("/api/tasks/status")
        .add_query_param("id", task_id)
        .await
        .json();
    assert_eq!(lookup["state"], json!("PENDING"));
    assert_eq!(lookup["message"], json!("Bulk delete task queued (2 images)"));

    let response = app
        .server
        .post("/api/images/retag")
        .json(&json!({ "filepath": "a/1.jpg" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_interactive_validation() {
    let app = create_test_app().await;

    let response = app
        .server
        .delete("/api/users")
        .json(&json!({ "username": "../alice" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Invalid username"));

    let response = app
        .server
        .delete("/api/images")
        .json(&json!({ "filepath": "alice/../../etc/passwd" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("filepath is required"));

    let response = app
        .server
        .post("/api/images/retag_bulk")
        .json(&json!({ "filepaths": [] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(app.broker.messages().is_empty());

    let response = app
        .server
        .delete("/api/users")
        .json(&json!({ "username": "alice" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_bulk_retag_is_singleton() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/images/retag_bulk")
        .json(&json!({ "filepaths": ["a/1.jpg", "a/2.jpg"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["queued_count"], json!(2));
    assert_eq!(body["message"], json!("Bulk retag task queued"));

    let status: Value = app.server.get("/api/retag/status").await.json();
    assert_eq!(status["state"], json!("PENDING"));
    assert_eq!(status["task_id"], body["task_id"]);

    let response = app
        .server
        .post("/api/images/retag_bulk")
        .json(&json!({ "filepaths": ["a/3.jpg"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Another bulk retag task is already running."));

    // 不同单例组互不影响
    let response = app.server.post("/api/autotag/reconcile").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_tag_endpoints() {
    let app = create_test_app().await;

    let body: Value = app.server.get("/api/tags").await.json();
    assert_eq!(body["tags"], json!([]));

    let response = app
        .server
        .delete("/api/tags")
        .json(&json!({ "tag": "  " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("tag is required"));

    let response = app
        .server
        .delete("/api/tags")
        .json(&json!({ "tag": "cat" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["deleted_count"], json!(0));
    assert_eq!(body["message"], json!("Deleted tag 'cat' from 0 entries"));

    let body: Value = app
        .server
        .post("/api/tags/files")
        .json(&json!({ "filepaths": ["a/1.jpg"] }))
        .await
        .json();
    assert_eq!(body["tags"]["a/1.jpg"], json!([]));
}

#[tokio::test]
async fn test_request_id_header() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-42"),
        )
        .await;
    assert_eq!(response.headers()["x-request-id"], "req-42");
}
