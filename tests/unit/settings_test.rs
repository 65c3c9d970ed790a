// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use xmdq::config::settings::Settings;

/// 环境变量覆盖默认值
#[test]
fn test_environment_overrides() {
    std::env::set_var("XMDQ__TRACKING__MAX_TRACKED_TASKS", "42");
    std::env::set_var("XMDQ__QUEUE__BROKER_PREFIX", "jobs");
    let settings = Settings::new().expect("settings");
    std::env::remove_var("XMDQ__TRACKING__MAX_TRACKED_TASKS");
    std::env::remove_var("XMDQ__QUEUE__BROKER_PREFIX");

    assert_eq!(settings.tracking.max_tracked_tasks, 42);
    assert_eq!(settings.queue.broker_prefix, "jobs");
    assert_eq!(settings.tracking.recent_window, 30);
    assert_eq!(settings.live_status.poll_interval_ms, 2000);

    std::env::set_var("XMDQ__LIVE_STATUS__POLL_INTERVAL_MS", "0");
    let rejected = Settings::new();
    std::env::remove_var("XMDQ__LIVE_STATUS__POLL_INTERVAL_MS");
    let message = rejected.expect_err("zero poll interval").to_string();
    assert!(message.contains("Invalid configuration"), "{message}");
}
