// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

/// 应用程序配置设置
///
/// 包含服务器、Redis、队列、任务跟踪、实时状态、autotagger、标签库和指标等配置项
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 队列配置
    pub queue: QueueSettings,
    /// 任务跟踪配置
    #[validate(nested)]
    pub tracking: TrackingSettings,
    /// 实时状态推送配置
    #[validate(nested)]
    pub live_status: LiveStatusSettings,
    /// Autotagger 配置
    pub autotagger: AutotaggerSettings,
    /// 标签库配置
    #[validate(nested)]
    pub tag_store: TagStoreSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
}

/// 队列配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// 长耗时任务使用的队列
    pub default_queue: String,
    /// 交互触发的短任务使用的队列
    pub interactive_queue: String,
    /// broker 键前缀
    pub broker_prefix: String,
}

/// 任务跟踪配置设置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrackingSettings {
    /// 状态存储键前缀
    pub key_prefix: String,
    /// 每个任务族最近任务列表的上限
    #[validate(range(min = 1))]
    pub max_tracked_tasks: usize,
    /// 未显式指定 id 时查询的最近任务数
    pub recent_window: usize,
    /// 任务状态记录 TTL（秒）
    #[validate(range(min = 1))]
    pub state_ttl_secs: u64,
    /// 单例指针 TTL（秒）
    #[validate(range(min = 1))]
    pub singleton_ttl_secs: u64,
}

/// 实时状态推送配置设置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LiveStatusSettings {
    /// 聚合轮询间隔（毫秒）
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,
    /// 客户端断线重连退避（毫秒）
    pub reconnect_backoff_ms: u64,
    /// SSE keep-alive 间隔（秒）
    #[validate(range(min = 1))]
    pub keep_alive_secs: u64,
    /// 广播通道容量
    #[validate(range(min = 1))]
    pub channel_capacity: usize,
}

/// Autotagger 配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct AutotaggerSettings {
    pub enabled: bool,
    pub url: Option<String>,
}

impl AutotaggerSettings {
    /// 启用且配置了 URL
    pub fn is_configured(&self) -> bool {
        self.enabled
            && self
                .url
                .as_deref()
                .map(|url| !url.trim().is_empty())
                .unwrap_or(false)
    }
}

/// 标签库配置设置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TagStoreSettings {
    /// SQLite 连接URL
    pub url: String,
    /// 最大连接数
    #[validate(range(min = 1))]
    pub max_connections: u32,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 导出器监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和
    /// `XMDQ__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败或取值越界
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("XMDQ").separator("__"));
        Self::load(builder.build()?)
    }

    /// 只包含内置默认值的配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::load(Self::builder()?.build()?)
    }

    fn load(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        settings
            .validate()
            .map_err(|e| ConfigError::Message(format!("Invalid configuration: {}", e)))?;
        Ok(settings)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Server
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("redis.url", "redis://127.0.0.1:6379/0")?
            // Broker queues
            .set_default("queue.default_queue", "default")?
            .set_default("queue.interactive_queue", "interactive")?
            .set_default("queue.broker_prefix", "asynq")?
            // Tracking
            .set_default("tracking.key_prefix", "xmd")?
            .set_default("tracking.max_tracked_tasks", 200)?
            .set_default("tracking.recent_window", 30)?
            .set_default("tracking.state_ttl_secs", 7 * 24 * 60 * 60)?
            .set_default("tracking.singleton_ttl_secs", 7 * 24 * 60 * 60)?
            // Live status
            .set_default("live_status.poll_interval_ms", 2000)?
            .set_default("live_status.reconnect_backoff_ms", 1000)?
            .set_default("live_status.keep_alive_secs", 15)?
            .set_default("live_status.channel_capacity", 16)?
            .set_default("autotagger.enabled", false)?
            .set_default("tag_store.url", "sqlite://xmdq-tags.db")?
            .set_default("tag_store.max_connections", 5)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
